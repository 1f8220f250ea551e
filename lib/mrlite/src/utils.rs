use std::str::FromStr;

/// Parses an environment variable, treating unset and unparsable values alike.
pub fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Like [`env_parse`], but zero counts as unset.
pub fn env_count(name: &str) -> Option<usize> {
    env_parse::<usize>(name).filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_values_and_ignores_garbage() {
        std::env::set_var("MRLITE_TEST_UTILS_OK", " 7 ");
        std::env::set_var("MRLITE_TEST_UTILS_BAD", "seven");
        std::env::set_var("MRLITE_TEST_UTILS_ZERO", "0");
        assert_eq!(env_parse::<usize>("MRLITE_TEST_UTILS_OK"), Some(7));
        assert_eq!(env_parse::<usize>("MRLITE_TEST_UTILS_BAD"), None);
        assert_eq!(env_parse::<usize>("MRLITE_TEST_UTILS_UNSET"), None);
        assert_eq!(env_parse::<usize>("MRLITE_TEST_UTILS_ZERO"), Some(0));
        assert_eq!(env_count("MRLITE_TEST_UTILS_ZERO"), None);
        assert_eq!(env_count("MRLITE_TEST_UTILS_OK"), Some(7));
    }
}
