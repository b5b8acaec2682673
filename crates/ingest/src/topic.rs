//! Topic parsing

use events::Channel;

/// Parse `{root}/{entity_id}/{channel}` into its bound segments.
/// Topics outside the root namespace or with an unknown channel segment
/// return `None` and are ignored upstream.
pub fn parse_topic<'a>(topic: &'a str, root: &str) -> Option<(&'a str, Channel)> {
    let mut parts = topic.splitn(3, '/');
    if parts.next()? != root {
        return None;
    }
    let entity_id = parts.next()?;
    if entity_id.is_empty() {
        return None;
    }
    let channel = Channel::from_topic_segment(parts.next()?)?;
    Some((entity_id, channel))
}
