use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicCancelOptions};
use lapin::{Channel, Connection};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::broker::connection::{open, BrokerConfig};
use crate::error::{Error, Result};
use crate::store::{LogDraft, RecordSink};

/// A running consumer bound to one durable queue.
///
/// Owns the broker connection and channel exclusively; they are touched only
/// during setup and shutdown. At most one subscription is active per
/// instance, and the delivery loop runs as a background task until the
/// delivery stream closes.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use postbox::broker::{BrokerConfig, Consumer};
/// use postbox::store::RecordSink;
///
/// # async fn demo(sink: Arc<dyn RecordSink>) -> postbox::error::Result<()> {
/// let config = BrokerConfig::default().with_queue("activity-logs");
/// let consumer = Consumer::start(config, sink).await?;
///
/// // ... run until it is time to stop ...
/// consumer.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct Consumer {
    connection: Connection,
    channel: Channel,
    consumer_tag: String,
    drained: watch::Receiver<bool>,
}

impl Consumer {
    /// Connect to the broker, bind the queue, and start the delivery loop.
    ///
    /// Returns once consumption has begun; deliveries are handed to `sink`
    /// by the background loop from then on. Any setup failure is fatal.
    pub async fn start(config: BrokerConfig, sink: Arc<dyn RecordSink>) -> Result<Self> {
        let manual_ack = !config.auto_ack;
        let (connection, channel, subscription) = open(&config).await?;

        // The server confirms (or assigns) the tag; cancel must use the same one.
        let consumer_tag = subscription.tag().as_str().to_string();

        let (drained_tx, drained) = watch::channel(false);
        tokio::spawn(process_deliveries(subscription, sink, manual_ack, drained_tx));

        Ok(Self {
            connection,
            channel,
            consumer_tag,
            drained,
        })
    }

    /// The server-confirmed consumer tag of the active subscription
    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }

    /// Block until the delivery loop has observed stream closure and finished
    /// handling every delivery it received.
    ///
    /// The drain flag is written exactly once and can be awaited from more
    /// than one place, so this does not race with `shutdown`.
    pub async fn wait_drained(&self) {
        let mut drained = self.drained.clone();
        if drained.wait_for(|flag| *flag).await.is_err() {
            warn!("delivery loop ended without signalling drain");
        }
    }

    /// Shut the consumer down: cancel the subscription, close the channel,
    /// close the connection, then wait for the delivery loop to drain.
    ///
    /// Errors from cancel and close are logged and the first one is returned,
    /// but the drain wait always runs — an in-flight delivery must finish
    /// before the caller may exit. There is no bound on the drain wait.
    pub async fn shutdown(&self) -> Result<()> {
        let mut first_error: Option<Error> = None;

        if let Err(err) = self
            .channel
            .basic_cancel(&self.consumer_tag, BasicCancelOptions::default())
            .await
        {
            error!(error = %err, consumer_tag = %self.consumer_tag, "consumer cancel failed");
            first_error.get_or_insert(err.into());
        }

        if let Err(err) = self.channel.close(200, "shutting down").await {
            error!(error = %err, "channel close failed");
            first_error.get_or_insert(err.into());
        }

        if let Err(err) = self.connection.close(200, "shutting down").await {
            error!(error = %err, "connection close failed");
            first_error.get_or_insert(err.into());
        }

        self.wait_drained().await;

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Core delivery-processing loop.
///
/// Processes deliveries strictly sequentially: the next delivery is not
/// taken until the sink call for the previous one has returned. Runs until
/// the stream closes — whether the broker closed it or shutdown cancelled
/// the subscription — then drains whatever was already dispatched and flips
/// the drain flag exactly once.
///
/// Generic over the stream so harnesses can drive it without a broker.
pub async fn process_deliveries<S>(
    mut deliveries: S,
    sink: Arc<dyn RecordSink>,
    manual_ack: bool,
    drained: watch::Sender<bool>,
) where
    S: Stream<Item = std::result::Result<Delivery, lapin::Error>> + Unpin,
{
    let mut delivery_count: u64 = 0;

    while let Some(next) = deliveries.next().await {
        let delivery = match next {
            Ok(delivery) => delivery,
            Err(err) => {
                error!(error = %err, "delivery stream error");
                continue;
            }
        };

        delivery_count += 1;
        debug!(
            delivery_count,
            delivery_tag = delivery.delivery_tag,
            bytes = delivery.data.len(),
            "received delivery"
        );

        match serde_json::from_slice::<LogDraft>(&delivery.data) {
            Ok(draft) => {
                if let Err(err) = sink.persist(draft).await {
                    error!(
                        error = %err,
                        delivery_tag = delivery.delivery_tag,
                        "failed to persist log record"
                    );
                }
            }
            Err(err) => {
                error!(
                    error = %err,
                    delivery_tag = delivery.delivery_tag,
                    "payload is not a valid log record, discarding"
                );
            }
        }

        // Acked whether or not handling succeeded; redelivery is not attempted.
        if manual_ack {
            if let Err(err) = delivery.acker.ack(BasicAckOptions::default()).await {
                error!(
                    error = %err,
                    delivery_tag = delivery.delivery_tag,
                    "failed to ack delivery"
                );
            }
        }
    }

    info!(delivery_count, "delivery stream closed, consumer drained");
    let _ = drained.send(true);
}
