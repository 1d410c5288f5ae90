//! Generation request payload and its assembler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ChatTurn, FileReference, FileState};

/// Errors raised while assembling a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Attachment '{name}' is {state}, only ready files can be attached")]
    AttachmentNotReady { name: String, state: FileState },
}

/// Sampling constants sent with every generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Low temperature keeps the analysis stable across calls
    pub temperature: f32,

    pub top_p: f32,

    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.95,
            max_output_tokens: 8192,
        }
    }
}

/// One part of the new user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePart<'a> {
    /// A ready attachment, sent as context
    File(&'a FileReference),

    /// The textual prompt
    Text(&'a str),
}

/// Everything one generation call needs. Built fresh per analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub history: Vec<ChatTurn>,
    pub attachments: Vec<FileReference>,
    pub prompt: String,
    pub generation_config: GenerationConfig,
}

impl GenerationRequest {
    /// Parts of the new message: attachments first, prompt last.
    pub fn message_parts(&self) -> Vec<MessagePart<'_>> {
        self.attachments
            .iter()
            .map(MessagePart::File)
            .chain(std::iter::once(MessagePart::Text(self.prompt.as_str())))
            .collect()
    }
}

/// Builds [`GenerationRequest`]s around a fixed system instruction.
#[derive(Debug, Clone)]
pub struct RequestAssembler {
    system_instruction: String,
    generation_config: GenerationConfig,
}

impl RequestAssembler {
    pub fn new(system_instruction: impl Into<String>, generation_config: GenerationConfig) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            generation_config,
        }
    }

    /// Assemble a request from the caller's inputs.
    ///
    /// History is copied in order. Every attachment must already be
    /// [`FileState::Ready`]; polling a pending upload is the uploader's job.
    pub fn build(
        &self,
        prompt: &str,
        history: &[ChatTurn],
        attachments: &[FileReference],
    ) -> Result<GenerationRequest, AssemblyError> {
        if let Some(file) = attachments.iter().find(|f| !f.is_ready()) {
            return Err(AssemblyError::AttachmentNotReady {
                name: file.name.clone(),
                state: file.state,
            });
        }

        Ok(GenerationRequest {
            system_instruction: self.system_instruction.clone(),
            history: history.to_vec(),
            attachments: attachments.to_vec(),
            prompt: prompt.to_string(),
            generation_config: self.generation_config,
        })
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn generation_config(&self) -> GenerationConfig {
        self.generation_config
    }
}
