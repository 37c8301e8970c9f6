//! Reply composer — classify, constrain, generate, verify.
//!
//! The composer's contract is the constraint set, not a fixed output:
//! generation is delegated to the completion backend, then the result is
//! verified against the constraints derived from the inquiry. A reply that
//! fails verification is rejected; the caller must not log or deliver it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::GenerationError;
use crate::llm::CompletionBackend;
use crate::mailbox::Inquiry;
use crate::policy::{
    InquiryClassifier, PolicyContext, PolicyDocument, ReplyConstraints, Salutation, prompt,
};

/// A composed reply together with the classification that shaped it.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub context: PolicyContext,
}

/// Composes policy-constrained replies. No side effects beyond the backend
/// call — logging and delivery belong to the batch runner.
pub struct ReplyComposer {
    policy: PolicyDocument,
    classifier: InquiryClassifier,
    backend: Arc<dyn CompletionBackend>,
}

impl ReplyComposer {
    pub fn new(policy: PolicyDocument, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            policy,
            classifier: InquiryClassifier::new(),
            backend,
        }
    }

    /// Compose a reply for one inquiry.
    pub async fn compose(&self, inquiry: &Inquiry) -> Result<Reply, GenerationError> {
        let ctx = self.classifier.classify(&inquiry.body);
        debug!(
            sender = %inquiry.sender,
            location = ?ctx.location,
            age = ?ctx.age,
            experienced = ctx.prior_experience,
            coverage = ?ctx.coverage,
            "Classified inquiry"
        );

        let salutation = Salutation::from_display_name(inquiry.sender_name.as_deref());
        let constraints = ReplyConstraints::for_context(&self.policy, &ctx, salutation.clone());
        let instruction = prompt::instruction(&self.policy, &ctx, salutation.as_ref());

        let text = self
            .backend
            .complete(&instruction, &inquiry.body)
            .await?;

        constraints
            .check(&text)
            .map_err(GenerationError::ConstraintViolation)?;

        info!(
            sender = %inquiry.sender,
            model = %self.backend.model_id(),
            chars = text.len(),
            "Composed reply"
        );
        Ok(Reply { text, context: ctx })
    }
}
