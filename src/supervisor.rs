//! Connectivity supervision shared by both endpoints.
//!
//! Once per tick the supervisor brings the link up, then the messaging
//! session, and reissues the role's subscriptions whenever a new session was
//! established. Reconciliation only runs when it reports the channel usable.

use crate::clock::Clock;
use crate::config::LinkConfig;
use crate::link::Link;
use crate::mqtt::MessageChannel;
use log::{info, warn};
use std::time::Duration;

/// Link and session health. `session_up` implies `link_up`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub link_up: bool,
    pub session_up: bool,
}

/// Result of one `ensure_connected` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Link and session were already up.
    Ready,
    /// A new session was established and every subscription was reissued.
    Resubscribed,
    /// The session connect attempt failed; the retry delay has elapsed.
    SessionDown,
    /// The link could not be brought up within the configured attempts.
    LinkDown,
}

impl Connectivity {
    /// Whether reconciliation may run on this tick.
    pub fn is_usable(self) -> bool {
        matches!(self, Connectivity::Ready | Connectivity::Resubscribed)
    }
}

/// Retry policy for link and session establishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub link_retry_interval: Duration,
    /// Retry the link forever when `None`.
    pub link_max_attempts: Option<u32>,
    pub session_retry_delay: Duration,
}

impl From<&LinkConfig> for RetryPolicy {
    fn from(config: &LinkConfig) -> Self {
        Self {
            link_retry_interval: config.retry_interval,
            link_max_attempts: config.max_attempts,
            session_retry_delay: config.session_retry_delay,
        }
    }
}

/// Owns [`ConnectionState`] for one endpoint.
pub struct ConnectionSupervisor<L, K> {
    link: L,
    clock: K,
    policy: RetryPolicy,
    state: ConnectionState,
}

impl<L: Link, K: Clock> ConnectionSupervisor<L, K> {
    pub fn new(link: L, clock: K, policy: RetryPolicy) -> Self {
        Self {
            link,
            clock,
            policy,
            state: ConnectionState::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Bring link and session up, subscribing to `subscriptions` on every
    /// new session.
    pub async fn ensure_connected<C: MessageChannel>(
        &mut self,
        channel: &mut C,
        subscriptions: &[String],
    ) -> Connectivity {
        if !self.link.is_up() {
            if self.state.link_up || channel.is_connected() {
                warn!("[Link] Link lost, invalidating MQTT session");
            }
            self.state = ConnectionState::default();
            channel.mark_disconnected();

            if !self.establish_link().await {
                return Connectivity::LinkDown;
            }
        }
        self.state.link_up = true;

        if channel.is_connected() {
            self.state.session_up = true;
            return Connectivity::Ready;
        }
        self.state.session_up = false;

        if let Err(e) = channel.connect().await {
            warn!(
                "[MQTT] Connection failed: {}, retrying in {:?}",
                e, self.policy.session_retry_delay
            );
            self.clock.sleep(self.policy.session_retry_delay).await;
            return Connectivity::SessionDown;
        }

        // A session missing any role subscription is not usable
        for topic in subscriptions {
            if let Err(e) = channel.subscribe(topic).await {
                warn!(
                    "[MQTT] Failed to subscribe to {}: {}, reconnecting in {:?}",
                    topic, e, self.policy.session_retry_delay
                );
                channel.mark_disconnected();
                self.clock.sleep(self.policy.session_retry_delay).await;
                return Connectivity::SessionDown;
            }
        }

        self.state.session_up = true;
        Connectivity::Resubscribed
    }

    async fn establish_link(&mut self) -> bool {
        let mut attempts = 0u32;
        loop {
            match self.link.connect().await {
                Ok(()) => {
                    info!("[Link] Link established after {} attempt(s)", attempts + 1);
                    return true;
                }
                Err(e) => {
                    attempts += 1;
                    if self
                        .policy
                        .link_max_attempts
                        .is_some_and(|max| attempts >= max)
                    {
                        warn!("[Link] Giving up after {} attempt(s): {}", attempts, e);
                        return false;
                    }
                    info!("[Link] {}, retrying...", e);
                    self.clock.sleep(self.policy.link_retry_interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::RecordingClock;
    use crate::link::testing::FakeLink;
    use crate::mqtt::testing::{FakeChannel, Op};

    fn policy(max_attempts: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            link_retry_interval: Duration::from_secs(1),
            link_max_attempts: max_attempts,
            session_retry_delay: Duration::from_secs(5),
        }
    }

    fn topics() -> Vec<String> {
        vec!["shadow/update/delta".to_string(), "shadow/extra".to_string()]
    }

    #[tokio::test]
    async fn test_ready_is_noop() {
        let mut supervisor =
            ConnectionSupervisor::new(FakeLink::up(), RecordingClock::default(), policy(None));
        let mut channel = FakeChannel::connected();

        let result = supervisor.ensure_connected(&mut channel, &topics()).await;

        assert_eq!(result, Connectivity::Ready);
        assert!(channel.ops.is_empty());
        assert_eq!(
            supervisor.state(),
            ConnectionState {
                link_up: true,
                session_up: true
            }
        );
    }

    #[tokio::test]
    async fn test_new_session_resubscribes_all_topics() {
        let mut supervisor =
            ConnectionSupervisor::new(FakeLink::up(), RecordingClock::default(), policy(None));
        let mut channel = FakeChannel::default();

        let result = supervisor.ensure_connected(&mut channel, &topics()).await;

        assert_eq!(result, Connectivity::Resubscribed);
        assert_eq!(
            channel.ops,
            vec![
                Op::Connect,
                Op::Subscribe("shadow/update/delta".to_string()),
                Op::Subscribe("shadow/extra".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_session_failure_waits_fixed_delay_one_attempt() {
        let clock = RecordingClock::default();
        let mut supervisor = ConnectionSupervisor::new(FakeLink::up(), &clock, policy(None));
        let mut channel = FakeChannel::default();
        channel.connect_results.extend([false, true]);

        let result = supervisor.ensure_connected(&mut channel, &topics()).await;
        assert_eq!(result, Connectivity::SessionDown);
        assert!(!result.is_usable());
        assert_eq!(channel.ops, vec![Op::Connect]);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
        assert!(supervisor.state().link_up);
        assert!(!supervisor.state().session_up);

        let result = supervisor.ensure_connected(&mut channel, &topics()).await;
        assert_eq!(result, Connectivity::Resubscribed);
        assert_eq!(channel.subscribed(), topics());
        assert_eq!(clock.sleeps().len(), 1);
    }

    #[tokio::test]
    async fn test_link_retried_until_up() {
        let clock = RecordingClock::default();
        let link = FakeLink::down_then(&[false, false, true]);
        let mut supervisor = ConnectionSupervisor::new(link, &clock, policy(None));
        let mut channel = FakeChannel::default();

        let result = supervisor.ensure_connected(&mut channel, &topics()).await;

        assert_eq!(result, Connectivity::Resubscribed);
        assert_eq!(supervisor.link().connect_calls, 3);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(1), Duration::from_secs(1)]
        );
    }

    #[tokio::test]
    async fn test_bounded_link_attempts() {
        let clock = RecordingClock::default();
        let link = FakeLink::down_then(&[false, false, false, false]);
        let mut supervisor = ConnectionSupervisor::new(link, &clock, policy(Some(2)));
        let mut channel = FakeChannel::default();

        let result = supervisor.ensure_connected(&mut channel, &topics()).await;

        assert_eq!(result, Connectivity::LinkDown);
        assert_eq!(supervisor.link().connect_calls, 2);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
        assert!(channel.ops.is_empty());
        assert_eq!(supervisor.state(), ConnectionState::default());
    }

    #[tokio::test]
    async fn test_subscribe_failure_drops_session() {
        let clock = RecordingClock::default();
        let mut supervisor = ConnectionSupervisor::new(FakeLink::up(), &clock, policy(None));
        let mut channel = FakeChannel::default();
        channel.fail_subscribe = true;

        let result = supervisor.ensure_connected(&mut channel, &topics()).await;
        assert_eq!(result, Connectivity::SessionDown);
        assert!(!result.is_usable());
        assert_eq!(channel.disconnect_marks, 1);
        assert!(!channel.is_connected());
        assert!(!supervisor.state().session_up);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);

        // The next tick reconnects and issues the full set again
        channel.fail_subscribe = false;
        let result = supervisor.ensure_connected(&mut channel, &topics()).await;
        assert_eq!(result, Connectivity::Resubscribed);
        assert_eq!(
            channel.ops,
            vec![
                Op::Connect,
                Op::Connect,
                Op::Subscribe("shadow/update/delta".to_string()),
                Op::Subscribe("shadow/extra".to_string()),
            ]
        );
        assert!(supervisor.state().session_up);
    }

    #[tokio::test]
    async fn test_link_loss_invalidates_session() {
        let mut supervisor =
            ConnectionSupervisor::new(FakeLink::up(), RecordingClock::default(), policy(None));
        let mut channel = FakeChannel::connected();
        assert_eq!(
            supervisor.ensure_connected(&mut channel, &topics()).await,
            Connectivity::Ready
        );

        // Link drops and comes back on the first attempt
        supervisor.link.up = false;
        supervisor.link.connect_results.push_back(true);

        let result = supervisor.ensure_connected(&mut channel, &topics()).await;

        assert_eq!(result, Connectivity::Resubscribed);
        assert_eq!(channel.disconnect_marks, 1);
        assert_eq!(channel.ops[0], Op::Connect);
        assert_eq!(channel.subscribed(), topics());
    }
}
