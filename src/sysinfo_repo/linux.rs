// Linux-specific helpers: interface link state and WiFi signal level from /sys and /proc.

/// Link state from /sys/class/net/<interface>/operstate. `None` if unreadable or not Linux.
pub(super) fn interface_is_up(interface_name: &str) -> Option<bool> {
    #[cfg(target_os = "linux")]
    {
        let path = format!("/sys/class/net/{}/operstate", interface_name);
        let content = std::fs::read_to_string(path).ok()?;
        parse_operstate(&content)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = interface_name;
        None
    }
}

/// Signal level in dBm for `interface_name` from /proc/net/wireless.
pub(super) fn read_wifi_signal_dbm(interface_name: &str) -> Option<i32> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/net/wireless").ok()?;
        parse_wireless_level(&content, interface_name)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = interface_name;
        None
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
// "unknown" is what many virtual and some wireless drivers report while carrying traffic.
fn parse_operstate(content: &str) -> Option<bool> {
    match content.trim() {
        "up" | "unknown" => Some(true),
        "down" | "dormant" | "lowerlayerdown" | "notpresent" => Some(false),
        _ => None,
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
/// /proc/net/wireless rows look like
/// ` wlan0: 0000   70.  -40.  -256        0      0      0      0      0        0`
/// (status, link quality, level, noise, ...). Level is the third numeric column.
fn parse_wireless_level(content: &str, interface_name: &str) -> Option<i32> {
    content.lines().find_map(|line| {
        let (name, rest) = line.trim_start().split_once(':')?;
        if name != interface_name {
            return None;
        }
        let level = rest.split_whitespace().nth(2)?;
        let level: f64 = level.trim_end_matches('.').parse().ok()?;
        Some(level.round() as i32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIRELESS: &str = "Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE
 face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22
 wlan0: 0000   70.  -40.  -256        0      0      0      0      0        0
 wlan1: 0000   31.  -79.  -256        0      0      0      3      0        0
";

    #[test]
    fn parses_level_for_requested_interface() {
        assert_eq!(parse_wireless_level(WIRELESS, "wlan0"), Some(-40));
        assert_eq!(parse_wireless_level(WIRELESS, "wlan1"), Some(-79));
    }

    #[test]
    fn missing_interface_has_no_level() {
        assert_eq!(parse_wireless_level(WIRELESS, "wlp2s0"), None);
        assert_eq!(parse_wireless_level("", "wlan0"), None);
    }

    #[test]
    fn operstate_values() {
        assert_eq!(parse_operstate("up\n"), Some(true));
        assert_eq!(parse_operstate("unknown\n"), Some(true));
        assert_eq!(parse_operstate("down\n"), Some(false));
        assert_eq!(parse_operstate("garbage"), None);
    }
}
