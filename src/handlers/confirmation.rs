//! Confirmation gate: a binary accept/reject prompt on one message

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{Interaction, suppress_foreign_signals, verdict_signals};
use crate::collaborators::Outbound;
use crate::config::InteractionConfig;
use crate::error::InteractionResult;
use crate::routing::{Dispatcher, Scope, WaitOutcome, WaitSpec};
use crate::value_objects::{MessageRef, UserId};

/// Result of a gate. Callers treat anything but `Accepted` as "do nothing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    Accepted,
    Rejected,
    TimedOut,
}

#[derive(Clone)]
pub struct ConfirmationGate {
    dispatcher: Dispatcher,
    outbound: Arc<dyn Outbound>,
    config: Arc<InteractionConfig>,
}

impl ConfirmationGate {
    pub fn new(dispatcher: Dispatcher, outbound: Arc<dyn Outbound>, config: Arc<InteractionConfig>) -> Self {
        Self {
            dispatcher,
            outbound,
            config,
        }
    }

    /// Ask `user` to accept or reject on `anchor` before `deadline`
    pub async fn confirm(
        &self,
        anchor: MessageRef,
        user: UserId,
        deadline: Instant,
    ) -> InteractionResult<Confirmation> {
        let interaction = Interaction::new(anchor.channel_id, user);
        let result = self.confirm_within(&interaction, anchor, deadline).await;
        interaction.close(&self.dispatcher);
        result
    }

    /// Run the gate as part of a longer interaction.
    ///
    /// The verdict waiter belongs to `owner`, so closing it ends the gate;
    /// that case reports `Rejected`.
    pub async fn confirm_within(
        &self,
        owner: &Interaction,
        anchor: MessageRef,
        deadline: Instant,
    ) -> InteractionResult<Confirmation> {
        let user = owner.user_id();
        let spec = WaitSpec::new(Scope::user(anchor.channel_id, user), deadline)
            .signals()
            .matching(move |event| {
                event
                    .as_signal()
                    .is_some_and(|s| s.message_id == anchor.message_id && s.signal.verdict().is_some())
            });
        // armed before the signals are offered so an early click is not lost
        let Some(handle) = owner.arm(&self.dispatcher, spec) else {
            return Ok(Confirmation::Rejected);
        };

        let bystanders = Interaction::new(anchor.channel_id, user);
        tokio::spawn(suppress_foreign_signals(
            self.dispatcher.clone(),
            self.outbound.clone(),
            bystanders.clone(),
            anchor,
            deadline,
        ));

        if let Err(e) = self
            .outbound
            .offer_signals(anchor, &verdict_signals(self.config.signal_style))
            .await
        {
            bystanders.close(&self.dispatcher);
            return Err(e.into());
        }

        let outcome = handle.wait().await;
        bystanders.close(&self.dispatcher);

        let confirmation = match outcome {
            WaitOutcome::Matched(event) => match event.as_signal().and_then(|s| s.signal.verdict()) {
                Some(true) => Confirmation::Accepted,
                _ => Confirmation::Rejected,
            },
            WaitOutcome::TimedOut => Confirmation::TimedOut,
            WaitOutcome::Cancelled => {
                debug!(message = %anchor.message_id, "gate closed by its interaction");
                Confirmation::Rejected
            }
        };
        info!(user = %user, message = %anchor.message_id, ?confirmation, "confirmation resolved");
        Ok(confirmation)
    }
}
