//! Channel name detection.

/// Extension trait for telling channel names apart from nicknames.
pub trait ChannelExt {
    /// Check if this string is a channel name.
    ///
    /// Channel names start with `#`, `&`, `+` or `!` and contain no space,
    /// comma or control characters.
    fn is_channel_name(&self) -> bool;
}

impl ChannelExt for str {
    fn is_channel_name(&self) -> bool {
        let mut chars = self.chars();
        match chars.next() {
            Some('#' | '&' | '+' | '!') => {}
            _ => return false,
        }
        chars.all(|c| c != ' ' && c != ',' && !c.is_control())
    }
}

impl ChannelExt for String {
    fn is_channel_name(&self) -> bool {
        self.as_str().is_channel_name()
    }
}
