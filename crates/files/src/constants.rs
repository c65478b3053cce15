/// Directory under the store root holding content-addressed logo images.
pub const LOGO_FOLDER_NAME: &str = "sha256";

/// Pointer file naming the active logo, relative to the store root.
pub const CURRENT_POINTER_NAME: &str = "current";

/// Media types the typesetting engine can embed.
pub const SUPPORTED_MEDIA_TYPES: &[(&str, &str)] = &[("image/png", "png"), ("image/jpeg", "jpg")];
