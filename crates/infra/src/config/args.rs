//! Process argument parsing
//!
//! The launcher hands the device key ("rei") to the game process as
//! `-rei <value>`. `--rei <value>`, `-rei=<value>` and `--rei=<value>` are
//! accepted as well. When the flag repeats, the last value wins.

const FLAGS: [&str; 2] = ["-rei", "--rei"];

/// Extract the device key from an argument list.
pub fn device_key_from_args<I, S>(args: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut found = None;
    let mut expecting_value = false;

    for arg in args {
        let arg = arg.as_ref();
        if expecting_value {
            expecting_value = false;
            if !arg.is_empty() && !FLAGS.contains(&arg) {
                found = Some(arg.to_string());
                continue;
            }
        }

        if FLAGS.contains(&arg) {
            expecting_value = true;
        } else if let Some(value) = FLAGS
            .iter()
            .find_map(|flag| arg.strip_prefix(flag).and_then(|rest| rest.strip_prefix('=')))
        {
            if !value.is_empty() {
                found = Some(value.to_string());
            }
        }
    }

    found
}

/// Device key passed to the current process, if any.
pub fn device_key_from_process() -> Option<String> {
    device_key_from_args(std::env::args().skip(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_single_dash_flag_with_separate_value() {
        assert_eq!(device_key_from_args(["-rei", "abc123"]).as_deref(), Some("abc123"));
    }

    #[test]
    fn reads_long_and_inline_forms() {
        assert_eq!(device_key_from_args(["--rei", "k1"]).as_deref(), Some("k1"));
        assert_eq!(device_key_from_args(["--rei=k2"]).as_deref(), Some("k2"));
        assert_eq!(device_key_from_args(["-rei=k3"]).as_deref(), Some("k3"));
    }

    #[test]
    fn ignores_unrelated_and_dangling_flags() {
        assert_eq!(device_key_from_args(["-screen-width", "1920"]), None);
        assert_eq!(device_key_from_args(["-rei"]), None);
        assert_eq!(device_key_from_args(["-rei="]), None);
        assert_eq!(device_key_from_args(["-reikey", "x"]), None);
    }

    #[test]
    fn last_occurrence_wins() {
        let args = ["-rei", "first", "-batchmode", "--rei=second"];
        assert_eq!(device_key_from_args(args).as_deref(), Some("second"));
    }

    #[test]
    fn flag_followed_by_flag_does_not_consume_it() {
        assert_eq!(device_key_from_args(["-rei", "--rei", "k"]).as_deref(), Some("k"));
    }
}
