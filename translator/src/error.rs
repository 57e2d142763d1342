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

use std::io::Error as IoError;

use log::SetLoggerError;
use log4rs::config::Errors as Log4RsError;
use openssl::error::ErrorStack as OpenSslError;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;
use thiserror::Error;
use tokio::task::JoinError;
use url::ParseError as UrlError;
use uuid::Error as UuidError;
use xmldoc::Error as XmlError;
use xmlsec::Error as XmlSecError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Generic Error: {0}")]
    Generic(String),

    #[error("IO Error: {0}")]
    IoError(IoError),

    #[error("Json Error: {0}")]
    JsonError(JsonError),

    #[error("XML Error: {0}")]
    XmlError(XmlError),

    #[error("XML Security Error: {0}")]
    XmlSecError(XmlSecError),

    #[error("OpenSSL Error: {0}")]
    OpenSslError(OpenSslError),

    #[error("Reqwest Error: {0}")]
    ReqwestError(ReqwestError),

    #[error("Url Error: {0}")]
    UrlError(UrlError),

    #[error("UUID Error: {0}")]
    UuidError(UuidError),

    #[error("Task Error: {0}")]
    JoinError(JoinError),

    #[error("Unable to set logger: {0}")]
    SetLoggerError(SetLoggerError),

    #[error("Unable to setup log4rs: {0}")]
    Log4RsError(Log4RsError),

    #[error("Missing element: {0}")]
    MissingElement(String),

    #[error("Missing attribute '{name}' at {path}")]
    MissingAttribute { path: String, name: String },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl From<String> for Error {
    fn from(v: String) -> Self {
        Self::Generic(v)
    }
}

impl From<IoError> for Error {
    fn from(v: IoError) -> Self {
        Self::IoError(v)
    }
}

impl From<JsonError> for Error {
    fn from(v: JsonError) -> Self {
        Self::JsonError(v)
    }
}

impl From<XmlError> for Error {
    fn from(v: XmlError) -> Self {
        Self::XmlError(v)
    }
}

impl From<XmlSecError> for Error {
    fn from(v: XmlSecError) -> Self {
        Self::XmlSecError(v)
    }
}

impl From<OpenSslError> for Error {
    fn from(v: OpenSslError) -> Self {
        Self::OpenSslError(v)
    }
}

impl From<ReqwestError> for Error {
    fn from(v: ReqwestError) -> Self {
        Self::ReqwestError(v)
    }
}

impl From<UrlError> for Error {
    fn from(v: UrlError) -> Self {
        Self::UrlError(v)
    }
}

impl From<UuidError> for Error {
    fn from(v: UuidError) -> Self {
        Self::UuidError(v)
    }
}

impl From<JoinError> for Error {
    fn from(v: JoinError) -> Self {
        Self::JoinError(v)
    }
}

impl From<SetLoggerError> for Error {
    fn from(v: SetLoggerError) -> Self {
        Self::SetLoggerError(v)
    }
}

impl From<Log4RsError> for Error {
    fn from(v: Log4RsError) -> Self {
        Self::Log4RsError(v)
    }
}
