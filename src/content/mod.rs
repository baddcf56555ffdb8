//! Content module - post models, rich text, pagination and article assembly

pub mod article;
pub mod pagination;
mod post;
pub mod rich_text;

pub use article::{ArticleAssembler, ArticleRoute, ArticleState, ArticleView, Neighbors};
pub use pagination::{PaginationError, Paginator};
pub use post::{Article, Banner, NeighborRef, PostPage, PostSummary, Section};
pub use rich_text::RichText;
