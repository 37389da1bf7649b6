pub mod comments;
pub mod insight;
pub mod keystore;
pub mod model;
pub mod pipeline;
pub mod services;
pub mod video_id;
pub mod youtube;

pub use comments::*;
pub use insight::*;
pub use keystore::*;
pub use model::*;
pub use pipeline::*;
pub use services::Services;
pub use video_id::*;
pub use youtube::YouTubeClient;
