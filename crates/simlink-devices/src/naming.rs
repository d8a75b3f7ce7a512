//! ---
//! sl_section: "04-devices"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Simulated robot devices and topic adapters."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---

/// Device name with every character outside `[A-Za-z0-9_]` replaced by `_`.
pub fn fixed_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Topic a device binds to when none is configured: `/` followed by its fixed name.
///
/// Names made only of `[A-Za-z0-9_]` map to distinct topics; names differing
/// only in replaced characters share one.
pub fn default_topic_name(device_name: &str) -> String {
    format!("/{}", fixed_name(device_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_names_pass_through() {
        assert_eq!(fixed_name("led_front"), "led_front");
        assert_eq!(default_topic_name("led_front"), "/led_front");
        assert_eq!(default_topic_name("ds0"), "/ds0");
    }

    #[test]
    fn illegal_characters_are_replaced() {
        assert_eq!(fixed_name("front led-2.a"), "front_led_2_a");
        assert_eq!(default_topic_name("gps/left"), "/gps_left");
        assert_eq!(fixed_name("café"), "caf_");
    }

    #[test]
    fn derivation_is_deterministic_and_distinct_for_legal_names() {
        let names = ["led0", "led1", "LED0", "led_0", "led"];
        let topics: std::collections::HashSet<_> =
            names.iter().map(|n| default_topic_name(n)).collect();
        assert_eq!(topics.len(), names.len());
        assert_eq!(default_topic_name("led0"), default_topic_name("led0"));
    }
}
