/*
 * Copyright (c) 2021 gematik GmbH
 * 
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 * 
 *    http://www.apache.org/licenses/LICENSE-2.0
 * 
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 */

use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;

use url::Url;

use crate::verification::TrustStore;

/// Settings threaded into the dispatcher.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub notifier_url: Option<Url>,
    pub trust_store: Option<Arc<TrustStore>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    InternalDev,
    Other(String),
}

impl Config {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            notifier_url: None,
            trust_store: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Environment::InternalDev)
    }
}

impl Environment {
    /// Whether dispense proposal returns are sent for rejected prescriptions.
    pub fn sends_returns(&self) -> bool {
        !matches!(self, Self::InternalDev)
    }
}

impl FromStr for Environment {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "internal-dev" => Ok(Self::InternalDev),
            other => Ok(Self::Other(other.to_owned())),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::InternalDev => write!(f, "internal-dev"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_dev_does_not_send_returns() {
        let env: Environment = "internal-dev".parse().unwrap();

        assert_eq!(env, Environment::InternalDev);
        assert!(!env.sends_returns());
    }

    #[test]
    fn other_environments_send_returns() {
        let env: Environment = "int".parse().unwrap();

        assert_eq!(env, Environment::Other("int".into()));
        assert!(env.sends_returns());
        assert_eq!(env.to_string(), "int");
    }
}
