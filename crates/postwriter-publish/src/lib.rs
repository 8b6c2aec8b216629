//! postwriter-publish: getting a finished post out of the editor.
//!
//! - `archive` - zip export with the manifest, body, images and scaffold page
//! - `bundle` - the path-unique file set shared by export and publish
//! - `fetch` - images fetched from URLs
//! - `scaffold` - the static `index.html` page
//! - `github` - the git-data calls, behind the `GitDataApi` trait
//! - `pipeline` - the publish state machine

pub mod archive;
pub mod bundle;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod github;
pub mod pipeline;
pub mod scaffold;

pub use archive::{Archive, archive_file_name, export_archive};
pub use bundle::{FileContents, PostBundle, PostFile};
pub use credentials::{Credentials, READINESS_MESSAGE, TOKEN_ENV};
pub use error::{ArchiveError, FetchError, PostwriterError, PublishError};
pub use fetch::{FetchedImage, HttpFetcher, ImageFetcher, fetch_featured, fetch_inline};
pub use github::{GitDataApi, GitHubClient, TreeEntry};
pub use pipeline::{PublishOptions, PublishPipeline, PublishReceipt, PublishStage};
pub use scaffold::{ScaffoldLoader, ScaffoldLocation, ScaffoldSource, load_optional_scaffold};
