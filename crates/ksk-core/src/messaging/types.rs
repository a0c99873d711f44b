/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_delete: bool,
    pub max_message_len: usize,
}
