/// Folder under the blob root holding blob bytes.
pub const OBJECTS_FOLDER_NAME: &str = "objects";

/// Folder under the blob root holding YAML metadata sidecars.
pub const METADATA_FOLDER_NAME: &str = "metadata";

/// Content type recorded when none is supplied and none can be detected.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Query parameter carrying the capability token on blob URLs.
pub const TOKEN_QUERY_PARAM: &str = "token";

pub(crate) const METADATA_EXTENSION: &str = "yaml";

pub(crate) const MAX_PATH_LEN: usize = 1024;
