//! # sizelapse-core
//!
//! Core library for sizelapse - an animated, zoomable view of how a Git
//! repository's file sizes evolve across its history.
//!
//! This crate walks the history into per-commit size trees, packs them into
//! nested circles, and animates between commits with keyed transitions.

pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod layout;
pub mod models;
pub mod pack;
pub mod player;
pub mod repository;
pub mod scene;
pub mod svg;
pub mod timeline;

pub use config::ViewConfig;
pub use error::{Error, Result};
pub use extract::{ExtractOptions, HistoryExtractor};
pub use filter::apply_filters;
pub use layout::LayoutKey;
pub use models::{CommitSnapshot, FilterConfig, HistoryList, HistoryResponse, TreeNode};
pub use pack::{FrontChainPacker, Packer};
pub use player::{Control, Player, PlayerEvent};
pub use repository::{GitCli, Repository};
pub use scene::{Frame, Scene, Transition};
pub use svg::render_svg;
pub use timeline::{render_commit, LoadState, Timeline};
