use bytes::Bytes;

/// Seam for the external form-encoding collaborator.
///
/// The engine never encodes forms itself; callers hand in anything that can
/// report a content type and produce its encoded bytes. Multipart, URL
/// encoding and friends live on the caller's side of this trait.
pub trait FormSource: Send + Sync {
    /// MIME content type of the encoded form, e.g.
    /// `application/x-www-form-urlencoded`.
    fn content_type(&self) -> String;

    /// The encoded form body.
    fn encode(&self) -> Bytes;
}
