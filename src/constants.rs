/// Version advertised to the coordinator in every request.
pub const UPLOADER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound of per-file upload tasks running at the same time.
pub const MAX_CONCURRENT_UPLOADS: usize = 6;

/// Public base path; a file's URL is this prefix followed by its storage key.
pub const PUBLIC_FILE_BASE_URL: &str = "https://utfs.io/f/";

/// Origin used when the coordinator URL is missing or relative.
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Path used when the coordinator URL has no path of its own.
pub const DEFAULT_API_PATH: &str = "/api/uploads";

pub const HEADER_VERSION: &str = "x-upload-version";
pub const HEADER_FE_PACKAGE: &str = "x-upload-fe-package";
pub const HEADER_BE_ADAPTER: &str = "x-upload-be-adapter";
/// Only ever injected server-side; the client never sends it.
pub const HEADER_API_KEY: &str = "x-upload-api-key";

/// Size of the pieces a presigned POST body is streamed in.
pub const PROGRESS_CHUNK_SIZE: usize = 64 * 1024;

/// Parts of one multi-part upload in flight at once.
pub const MULTIPART_PART_CONCURRENCY: usize = 4;

/// Attempts per part before a multi-part transfer gives up.
pub const MULTIPART_MAX_RETRIES: u32 = 10;
