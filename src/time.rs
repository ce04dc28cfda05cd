use std::ops::{Add, AddAssign, Sub, SubAssign};

macro_rules! time_unit {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Add,
            derive_more::Display,
            derive_more::FromStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(i64);

        impl $name {
            pub const ZERO: $name = Self::new(0);
            pub const ONE: $name = Self::new(1);
            pub const MIN: $name = Self::new(i64::MIN);
            pub const MAX: $name = Self::new(i64::MAX);

            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn into_i64(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(val: i64) -> Self {
                Self(val)
            }
        }
    };
}

time_unit!(Time);

impl Time {
    pub const fn into_delta(self) -> Delta {
        Delta::new(self.0)
    }

    pub fn saturating_add(self, rhs: Delta) -> Time {
        Self(self.0.saturating_add(rhs.0))
    }
}

time_unit!(Delta);

impl Delta {
    pub const fn into_time(self) -> Time {
        Time::new(self.0)
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add<Delta> for Time {
    type Output = Time;

    fn add(self, rhs: Delta) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub<Delta> for Time {
    type Output = Time;

    fn sub(self, rhs: Delta) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sub<Time> for Time {
    type Output = Delta;

    fn sub(self, rhs: Time) -> Self::Output {
        Delta::new(self.0 - rhs.0)
    }
}

impl AddAssign<Delta> for Time {
    fn add_assign(&mut self, rhs: Delta) {
        *self = Self(self.0 + rhs.0)
    }
}

impl SubAssign<Delta> for Time {
    fn sub_assign(&mut self, rhs: Delta) {
        *self = Self(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_arithmetic() {
        let t = Time::new(-5) + Delta::new(8);
        assert_eq!(t, Time::new(3));
        assert_eq!(Time::new(3) - Time::new(10), Delta::new(-7));
        assert!(Delta::new(-7).is_negative());
    }

    #[test]
    fn saturates_at_max() {
        assert_eq!(Time::MAX.saturating_add(Delta::ONE), Time::MAX);
    }

    #[test]
    fn parse_and_display() -> anyhow::Result<()> {
        let t: Time = "-42".parse()?;
        assert_eq!(t, Time::new(-42));
        assert_eq!(t.to_string(), "-42");
        Ok(())
    }
}
