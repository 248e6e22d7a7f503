//! Framer Wire - backend payloads and tolerant transforms
//!
//! Maps between the backend's snake_case `FrameResponse` and the
//! [`framer_core::Frame`] model:
//! - [`decode_frame`] accepts every section shape older backends produced
//! - [`encode_frame`] emits the canonical shape
//! - `decode(encode(x)) == x` for every frame decode can produce
//!
//! # Example
//!
//! ```rust
//! use framer_wire::{decode_frame_json, encode_frame};
//!
//! let body = r#"{
//!     "id": "f-2024-01-01-abc123",
//!     "type": "feature",
//!     "status": "draft",
//!     "owner": "alice",
//!     "content": {"user_perspective": "ad-hoc note"}
//! }"#;
//! let frame = decode_frame_json(body).unwrap();
//! assert_eq!(frame.content.user_perspective.neutral.context, "ad-hoc note");
//!
//! let wire = encode_frame(&frame);
//! assert!(wire.content.user_perspective.as_str().unwrap().starts_with('{'));
//! ```

#![warn(unreachable_pub)]

pub mod decode;
pub mod encode;
pub mod error;
pub mod sections;
pub mod wire;

pub use decode::{
    decode_comment, decode_content, decode_frame, decode_frame_at, decode_frame_json,
    decode_list_item, parse_timestamp,
};
pub use encode::{
    comment_request, create_request, encode_comment, encode_content, encode_frame,
    encode_frame_json, format_timestamp, status_request, update_request,
};
pub use error::TransformError;
pub use framer_core::lang::pick_lang;
pub use sections::{decode_section, encode_section, WireSection};
pub use wire::{
    ChatReply, ChatRequest, CommentResponse, CreateCommentRequest, CreateFrameRequest,
    DistillRequest, ErrorBody, EvaluationResponse, FrameFilters, FrameListItem, FrameResponse,
    GenerateAnswer, GenerateRequest, GenerateResponse, KnowledgeCategory, KnowledgeEntry,
    KnowledgeSource, Questionnaire, TemplateListItem, TemplateQuestion, TemplateResponse,
    TemplateSection, UpdateFrameRequest, UpdateStatusRequest, User, WireContent, WireMeta,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
