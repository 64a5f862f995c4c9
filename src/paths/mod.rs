//! Shell paths and their translation to API ids and endpoints

pub mod translate;
pub mod types;
pub mod url;

pub use translate::translate_path;
pub use types::*;
pub use url::{
    name_or_slug, object_url, object_url_generic, parse_wildcard_response, FilterMap,
    ObjectsQuery, QueryParams,
};
