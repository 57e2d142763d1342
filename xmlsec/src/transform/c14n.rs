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

use std::io::{Error as IoError, ErrorKind, Write};

use xmldoc::C14nMode;

use crate::Error;

use super::{Data, DataType, DataTypes, Transform, TransformBuilder};

/* C14nMethod */

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum C14nMethod {
    C14n_1_0,
    C14n_Exclusive_1_0,
}

impl C14nMethod {
    pub fn from_algorithm(algorithm: &str) -> Result<Self, Error> {
        match algorithm.trim() {
            TRANSFORM_C14N_1_0 => Ok(Self::C14n_1_0),
            TRANSFORM_C14N_1_0_EXCLUSIVE => Ok(Self::C14n_Exclusive_1_0),
            x => Err(Error::UnknownCanonicalizationMethod(x.into())),
        }
    }
}

impl Into<C14nMode> for C14nMethod {
    fn into(self) -> C14nMode {
        match self {
            C14nMethod::C14n_1_0 => C14nMode::Inclusive,
            C14nMethod::C14n_Exclusive_1_0 => C14nMode::Exclusive,
        }
    }
}

/* C14n */

pub struct C14n {
    method: C14nMethod,
}

impl C14n {
    pub fn new(method: C14nMethod) -> Self {
        Self { method }
    }
}

impl<'a> TransformBuilder<'a> for C14n {
    fn input_types(&self) -> DataTypes {
        DataTypes::Xml
    }

    fn output_type(&self) -> Option<DataType> {
        Some(DataType::Binary)
    }

    fn build(
        self: Box<Self>,
        next: Option<Box<dyn Transform + 'a>>,
    ) -> Result<Box<dyn Transform + 'a>, Error> {
        let Self { method } = *self;

        Ok(Box::new(C14nTransform { next, method }))
    }
}

/* C14nTransform */

struct C14nTransform<'a> {
    next: Option<Box<dyn Transform + 'a>>,
    method: C14nMethod,
}

struct Writer<'a>(&'a mut dyn Transform);

impl<'a> Transform for C14nTransform<'a> {
    fn name(&self) -> &str {
        "c14n_transform"
    }

    fn next(&self) -> Option<&dyn Transform> {
        self.next.as_deref()
    }

    fn update(&mut self, data: Data) -> Result<(), Error> {
        let element = match data {
            Data::Xml(element) => element,
            x => return Err(Error::UnexpectedDataType(x.into())),
        };

        let next = self.next.as_mut().ok_or(Error::UnexpectedEndOfChain)?;
        let mut writer = Writer(&mut **next);

        element.c14n(self.method.into(), &mut writer)?;

        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), Error> {
        self.next.ok_or(Error::UnexpectedEndOfChain)?.finish()
    }
}

impl Write for Writer<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        match self.0.update(Data::BinaryRaw(buf)) {
            Ok(()) => Ok(buf.len()),
            Err(err) => Err(IoError::new(ErrorKind::Other, err)),
        }
    }

    fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}

pub const TRANSFORM_C14N_1_0: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub const TRANSFORM_C14N_1_0_EXCLUSIVE: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
