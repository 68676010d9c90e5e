/// How requests to the store API authenticate
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// Send the key in an `x-api-key` header
    Apikey(String),
    /// Don't use any authentication
    None,
}

impl Auth {
    pub fn new(apikey: Option<String>) -> Self {
        match apikey {
            Some(apikey) if !apikey.is_empty() => Self::Apikey(apikey),
            _ => Self::None,
        }
    }
}

impl std::fmt::Display for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apikey(_) => write!(f, "Apikey"),
            Self::None => write!(f, "None"),
        }
    }
}

// Keys stay out of logs
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
