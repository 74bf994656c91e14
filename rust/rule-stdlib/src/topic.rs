//! MQTT/EMQX-style topic wildcard matching, the concrete policy for `=~`'s
//! semantics on topic-like operands.

use rule_core::external::TopicMatcher;

#[derive(Debug, Default)]
pub struct MqttTopicMatcher;

impl TopicMatcher for MqttTopicMatcher {
    /// `pattern` is split on `/`. `+` matches exactly one segment; a
    /// trailing `#` matches zero or more remaining segments; every other
    /// segment must match literally.
    fn matches(&self, text: &str, pattern: &str) -> bool {
        let mut text_segments = text.split('/');
        let mut pattern_segments = pattern.split('/').peekable();

        loop {
            match pattern_segments.next() {
                None => return text_segments.next().is_none(),
                Some("#") => return pattern_segments.peek().is_none(),
                Some("+") => {
                    if text_segments.next().is_none() {
                        return false;
                    }
                }
                Some(literal) => match text_segments.next() {
                    Some(t) if t == literal => {}
                    _ => return false,
                },
            }
        }
    }
}
