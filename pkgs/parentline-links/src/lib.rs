//! Parentline Links - deep links into the Parentline mobile client
//!
//! External links reach the app in four shapes: in-app paths, app-scheme
//! URIs, universal HTTPS links and development-tunnel URIs. This crate folds
//! all of them into one [`CanonicalPath`] grammar and then plans the stack
//! operations that bring the user to that screen with a usable back stack.
//!
//! ```rust
//! use parentline_links::{CanonicalPath, DeepLinkResolver, LinkConfig};
//!
//! let resolver = DeepLinkResolver::new(LinkConfig::default());
//! assert_eq!(
//!     resolver.resolve("exp://10.0.0.5:8081/--/?studentId=7&messageId=99"),
//!     CanonicalPath::Message { student_id: 7, message_id: 99 },
//! );
//! ```

pub mod dedup;
pub mod error;
pub mod navigation;
pub mod path;
pub mod resolver;

pub use dedup::LinkDeduplicator;
pub use error::LinkError;
pub use navigation::{
    LinkOrigin, NavStep, NavigationContext, NavigationOrchestrator, NavigationPlan, StudentCount,
    TargetDepth,
};
pub use path::CanonicalPath;
pub use resolver::{rewrite_for_single_student, DeepLinkResolver, LinkConfig, LinkKind};
