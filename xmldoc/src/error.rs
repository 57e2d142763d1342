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
use std::string::FromUtf8Error;
use std::str::Utf8Error;

use quick_xml::Error as QuickXmlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("XML Error at position {position}: {error}")]
    XmlError {
        position: usize,
        error: QuickXmlError,
    },

    #[error("IO Error: {0}")]
    IoError(IoError),

    #[error("UTF-8 Error: {0}")]
    Utf8Error(Utf8Error),

    #[error("Document does not contain a root element!")]
    EmptyDocument,

    #[error("Document contains more than one root element: {0}!")]
    MultipleRoots(String),

    #[error("Element is not closed: {0}!")]
    UnclosedElement(String),

    #[error("Unexpected closing tag: {0}!")]
    UnexpectedEndTag(String),

    #[error("Text outside of the root element!")]
    TextOutsideRoot,
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Self::IoError(err)
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Self::Utf8Error(err)
    }
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Self {
        Self::Utf8Error(err.utf8_error())
    }
}
