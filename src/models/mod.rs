pub mod chunk;
pub mod generation;
pub mod outline;
pub mod page;
pub mod source;

pub use chunk::Chunk;
pub use generation::GenerationResult;
pub use outline::{NodeLevel, OutlineNode, PublishBatch};
pub use page::{ErrorRecord, Page, PageId};
pub use source::SourceDocument;
