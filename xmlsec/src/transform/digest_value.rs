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

use base64::{decode, encode};

use crate::Error;

use super::{Data, DataTypes, Transform, TransformBuilder};

/* DigestValue */

/// Terminal step comparing the produced digest with the expected one.
/// Base64 input is decoded first, so line breaks in either value are ignored.
pub struct DigestValue<'a> {
    data: Data<'a>,
}

impl<'a> DigestValue<'a> {
    pub fn new(data: Data<'a>) -> Self {
        Self { data }
    }
}

impl<'a> TransformBuilder<'a> for DigestValue<'a> {
    fn input_types(&self) -> DataTypes {
        DataTypes::Binary | DataTypes::Base64
    }

    fn build(
        self: Box<Self>,
        next: Option<Box<dyn Transform + 'a>>,
    ) -> Result<Box<dyn Transform + 'a>, Error> {
        let Self { data } = *self;

        Ok(Box::new(DigestValueTransform {
            next,
            actual: Vec::new(),
            expected: to_bytes(data)?,
        }))
    }
}

/* DigestValueTransform */

struct DigestValueTransform<'a> {
    next: Option<Box<dyn Transform + 'a>>,
    actual: Vec<u8>,
    expected: Vec<u8>,
}

impl<'a> Transform for DigestValueTransform<'a> {
    fn name(&self) -> &str {
        "digest_value_transform"
    }

    fn next(&self) -> Option<&dyn Transform> {
        self.next.as_deref()
    }

    fn update(&mut self, data: Data) -> Result<(), Error> {
        let data = to_bytes(data)?;

        self.actual.extend_from_slice(&data);

        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), Error> {
        if self.actual == self.expected {
            Ok(())
        } else {
            Err(Error::InvalidDigestValue {
                actual: encode(&self.actual),
                expected: encode(&self.expected),
            })
        }
    }
}

fn to_bytes(data: Data) -> Result<Vec<u8>, Error> {
    match data {
        Data::Binary(data) => Ok(data.to_vec()),
        Data::BinaryRaw(data) => Ok(data.to_vec()),
        Data::Base64(data) => {
            let data = data
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>();

            Ok(decode(&data)?)
        }
        x => Err(Error::UnexpectedDataType(x.into())),
    }
}
