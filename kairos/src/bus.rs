use kairos_execution::{Order, OrderEvent, Position};
use kairos_instrument::{Bar, ClientOrderId, QuoteTick, StrategyId, TradeTick};
use indexmap::IndexMap;
use smol_str::SmolStr;

/// Every payload that travels over the [`MessageBus`] (`spec.md` §6's topic grammar).
///
/// A single closed enum rather than a type-erased `Any` - the bus is internal to the kernel and
/// every publisher/subscriber already knows the shape of what it sends and receives.
#[derive(Debug, Clone)]
pub enum Message {
    Bar(Bar),
    Quote(QuoteTick),
    Trade(TradeTick),
    OrderEvent {
        strategy_id: StrategyId,
        order: Order,
        event: OrderEvent,
    },
    OrderDenied {
        strategy_id: StrategyId,
        client_order_id: ClientOrderId,
        reason: String,
    },
    PositionOpened(Position),
    PositionChanged(Position),
    PositionClosed(Position),
}

/// A callback registered against a topic or endpoint. Boxed because subscribers are closures
/// closing over strategy state.
pub type Handler = Box<dyn FnMut(&Message)>;

/// Handle returned by [`MessageBus::subscribe`], used to [`MessageBus::unsubscribe`] later.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SubscriptionId(usize);

/// Synchronous single-producer-many-consumer pub/sub, plus 1-to-1 endpoints (`spec.md` §4.1).
///
/// Subscriber lists live in an [`IndexMap`] keyed by topic so iteration order is insertion
/// order, never a `std::collections::HashMap`'s unordered iteration - determinism requires it
/// (`spec.md` §5/§9).
#[derive(Default)]
pub struct MessageBus {
    topics: IndexMap<SmolStr, IndexMap<SubscriptionId, Handler>>,
    endpoints: IndexMap<SmolStr, Handler>,
    next_subscription_id: usize,
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("topics", &self.topics.keys().collect::<Vec<_>>())
            .field("endpoints", &self.endpoints.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` against `topic`, returning a [`SubscriptionId`] for later
    /// [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(&mut self, topic: impl Into<SmolStr>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription_id);
        self.next_subscription_id += 1;

        self.topics.entry(topic.into()).or_default().insert(id, handler);

        id
    }

    /// Remove the subscriber identified by `id` from `topic`, if present.
    pub fn unsubscribe(&mut self, topic: &str, id: SubscriptionId) {
        if let Some(subscribers) = self.topics.get_mut(topic) {
            subscribers.shift_remove(&id);
        }
    }

    /// Deliver `msg` to every current subscriber of `topic`, in subscription order, before
    /// returning.
    ///
    /// Dispatch snapshots the subscriber *ids* present at the start of the call, then looks each
    /// one up in the live map as it goes: a handler that unsubscribes itself (or anyone else)
    /// mid-dispatch does not affect the delivery already in flight, and a handler that
    /// subscribes a new callback does not have it invoked until the next `publish`
    /// (`spec.md` §4.1).
    pub fn publish(&mut self, topic: &str, msg: &Message) {
        let Some(subscribers) = self.topics.get(topic) else {
            return;
        };
        let snapshot: Vec<SubscriptionId> = subscribers.keys().copied().collect();

        for id in snapshot {
            if let Some(subscribers) = self.topics.get_mut(topic) {
                if let Some(handler) = subscribers.get_mut(&id) {
                    handler(msg);
                }
            }
        }
    }

    /// Register `handler` as the sole handler for `endpoint`. A second call replaces the first
    /// (`spec.md` §4.1: "at-most-one handler per endpoint").
    pub fn register(&mut self, endpoint: impl Into<SmolStr>, handler: Handler) {
        self.endpoints.insert(endpoint.into(), handler);
    }

    /// Deliver `msg` to `endpoint`'s handler. A no-op if nothing is registered.
    pub fn send(&mut self, endpoint: &str, msg: &Message) {
        if let Some(handler) = self.endpoints.get_mut(endpoint) {
            handler(msg);
        }
    }
}
