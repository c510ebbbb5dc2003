use std::{fmt::Display, str::FromStr};

pub enum Toggle {
    On,
    Off,
    Error,
}

impl FromStr for Toggle {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, <Self as FromStr>::Err> {
        match s.to_lowercase().as_str() {
            "on" | "si" | "sì" | "attiva" => Ok(Toggle::On),
            "off" | "no" | "disattiva" => Ok(Toggle::Off),
            _ => Ok(Toggle::Error),
        }
    }
}

pub enum TimeUnit {
    Seconds(u64),
    Minutes(u64),
    Hours(u64),
}

impl TimeUnit {
    /// `None` when the value doesn't fit in a `u64` of seconds.
    pub fn as_secs(&self) -> Option<u64> {
        match self {
            TimeUnit::Seconds(t) => Some(*t),
            TimeUnit::Minutes(t) => t.checked_mul(60),
            TimeUnit::Hours(t) => t.checked_mul(3600),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, <Self as FromStr>::Err> {
        const INVALID: &str = "Unità non valida, usa: s, m, h";
        let s = s.trim().to_lowercase();
        if let Ok(n) = s.parse::<u64>() {
            return Ok(TimeUnit::Seconds(n));
        }
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or(INVALID)?;
        let (num, unit) = s.split_at(split);
        let num = num.parse::<u64>().map_err(|_| INVALID)?;
        match unit.trim() {
            "s" | "sec" | "secondi" => Ok(TimeUnit::Seconds(num)),
            "m" | "min" | "minuti" => Ok(TimeUnit::Minutes(num)),
            "h" | "ore" => Ok(TimeUnit::Hours(num)),
            _ => Err(INVALID),
        }
    }
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeUnit::Seconds(t) => write!(f, "{} secondi", t),
            TimeUnit::Minutes(t) => write!(f, "{} minuti", t),
            TimeUnit::Hours(t) => write!(f, "{} ore", t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpsChoice {
    Sasso,
    Carta,
    Forbici,
}

pub const RPS_CHOICES: [RpsChoice; 3] = [RpsChoice::Sasso, RpsChoice::Carta, RpsChoice::Forbici];

impl RpsChoice {
    pub fn beats(self, other: RpsChoice) -> bool {
        matches!(
            (self, other),
            (RpsChoice::Sasso, RpsChoice::Forbici)
                | (RpsChoice::Carta, RpsChoice::Sasso)
                | (RpsChoice::Forbici, RpsChoice::Carta)
        )
    }
}

impl FromStr for RpsChoice {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, <Self as FromStr>::Err> {
        match s.to_lowercase().as_str() {
            "sasso" | "pietra" => Ok(RpsChoice::Sasso),
            "carta" => Ok(RpsChoice::Carta),
            "forbici" | "forbice" => Ok(RpsChoice::Forbici),
            _ => Err("Scegli tra sasso, carta o forbici"),
        }
    }
}

impl Display for RpsChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpsChoice::Sasso => write!(f, "🪨 sasso"),
            RpsChoice::Carta => write!(f, "📄 carta"),
            RpsChoice::Forbici => write!(f, "✂️ forbici"),
        }
    }
}

pub enum Amount {
    All,
    Exact(u64),
    Error,
}

impl Amount {
    /// Resolves against the available balance; `None` when nothing can be moved.
    pub fn resolve(&self, available: u64) -> Option<u64> {
        match self {
            Amount::All if available > 0 => Some(available),
            Amount::Exact(n) if *n > 0 => Some(*n),
            _ => None,
        }
    }
}

impl FromStr for Amount {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, <Self as FromStr>::Err> {
        match s.to_lowercase().as_str() {
            "all" | "tutto" | "tutti" => Ok(Amount::All),
            n => Ok(n.parse::<u64>().map(Amount::Exact).unwrap_or(Amount::Error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_units_parse_with_and_without_suffix() {
        assert_eq!("10".parse::<TimeUnit>().unwrap().as_secs(), Some(10));
        assert_eq!("2m".parse::<TimeUnit>().unwrap().as_secs(), Some(120));
        assert_eq!("1h".parse::<TimeUnit>().unwrap().as_secs(), Some(3600));
        assert!("5x".parse::<TimeUnit>().is_err());
        assert!("abc".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn oversized_durations_do_not_overflow() {
        assert_eq!(
            "307445734561825862m".parse::<TimeUnit>().unwrap().as_secs(),
            None
        );
        assert_eq!("18446744073709551615h".parse::<TimeUnit>().unwrap().as_secs(), None);
        assert_eq!(
            "18446744073709551615".parse::<TimeUnit>().unwrap().as_secs(),
            Some(u64::MAX)
        );
    }

    #[test]
    fn rps_rules() {
        assert!(RpsChoice::Sasso.beats(RpsChoice::Forbici));
        assert!(RpsChoice::Carta.beats(RpsChoice::Sasso));
        assert!(RpsChoice::Forbici.beats(RpsChoice::Carta));
        assert!(!RpsChoice::Sasso.beats(RpsChoice::Sasso));
        assert_eq!("CARTA".parse::<RpsChoice>(), Ok(RpsChoice::Carta));
    }

    #[test]
    fn amount_all_uses_available_balance() {
        assert_eq!("tutto".parse::<Amount>().unwrap().resolve(70), Some(70));
        assert_eq!("all".parse::<Amount>().unwrap().resolve(0), None);
        assert_eq!("15".parse::<Amount>().unwrap().resolve(3), Some(15));
        assert!(matches!("x".parse::<Amount>().unwrap(), Amount::Error));
    }
}
