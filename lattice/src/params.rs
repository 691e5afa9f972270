//! Global parameters read once from environment variables.
//!
//! Tunables that are not worth a constructor argument but can matter when the
//! lattice gets big. A parameter is initialised on its first access; later
//! changes to the environment are ignored.

use std::str::FromStr;

use once_cell::sync::OnceCell;

/// A lazily-initialised parameter backed by an environment variable, with a
/// hardcoded default used when the variable is unset or unparseable.
pub struct EnvParam<T> {
    value: OnceCell<T>,
    env: &'static str,
    default: &'static str,
}

impl<T> EnvParam<T> {
    pub const fn new(env: &'static str, default: &'static str) -> EnvParam<T> {
        EnvParam {
            value: OnceCell::new(),
            env,
            default,
        }
    }
}

impl<T: FromStr + Clone> EnvParam<T> {
    pub fn get(&self) -> T {
        self.value
            .get_or_init(|| {
                let fallback = || match T::from_str(self.default) {
                    Ok(v) => v,
                    Err(_) => panic!("invalid default value \"{}\" for {}", self.default, self.env),
                };
                match std::env::var(self.env) {
                    Ok(raw) => T::from_str(&raw).unwrap_or_else(|_| {
                        eprintln!(
                            "[{}] could not parse \"{raw}\", using default \"{}\"",
                            self.env, self.default
                        );
                        fallback()
                    }),
                    Err(_) => fallback(),
                }
            })
            .clone()
    }
}

/// Universe width from which the unexplored frontier switches from a hash set
/// to a dense bitset over the whole code range.
pub static DENSE_FRONTIER_MIN_BITS: EnvParam<usize> =
    EnvParam::new("PWLAT_DENSE_FRONTIER_MIN_BITS", "20");

/// Hard cap on the universe width accepted by the bitset-backed map. The
/// frontier occupies one bit per code, so every added constraint doubles it.
pub static MAX_UNIVERSE_BITS: EnvParam<usize> = EnvParam::new("PWLAT_MAX_UNIVERSE_BITS", "28");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        static PARAM: EnvParam<usize> = EnvParam::new("PWLAT_TEST_UNSET_PARAM", "17");
        assert_eq!(PARAM.get(), 17);
    }

    #[test]
    fn environment_wins_over_default() {
        static PARAM: EnvParam<usize> = EnvParam::new("PWLAT_TEST_SET_PARAM", "17");
        std::env::set_var("PWLAT_TEST_SET_PARAM", "23");
        assert_eq!(PARAM.get(), 23);
    }
}
