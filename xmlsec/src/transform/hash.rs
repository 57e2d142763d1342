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

use openssl::hash::{Hasher, MessageDigest};

use crate::Error;

use super::{Data, DataType, DataTypes, Transform, TransformBuilder};

/* HashMethod */

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum HashMethod {
    Sha1,
    Sha256,
}

impl HashMethod {
    pub fn from_algorithm(algorithm: &str) -> Result<Self, Error> {
        match algorithm.trim() {
            DIGEST_SHA1 => Ok(Self::Sha1),
            DIGEST_SHA256 => Ok(Self::Sha256),
            x => Err(Error::UnknownDigestMethod(x.into())),
        }
    }
}

impl Into<MessageDigest> for HashMethod {
    fn into(self) -> MessageDigest {
        match self {
            HashMethod::Sha1 => MessageDigest::sha1(),
            HashMethod::Sha256 => MessageDigest::sha256(),
        }
    }
}

/* Hash */

pub struct Hash {
    method: HashMethod,
}

impl Hash {
    pub fn new(method: HashMethod) -> Self {
        Self { method }
    }
}

impl<'a> TransformBuilder<'a> for Hash {
    fn input_types(&self) -> DataTypes {
        DataTypes::Binary
    }

    fn output_type(&self) -> Option<DataType> {
        Some(DataType::Binary)
    }

    fn build(
        self: Box<Self>,
        next: Option<Box<dyn Transform + 'a>>,
    ) -> Result<Box<dyn Transform + 'a>, Error> {
        let Self { method } = *self;

        let hasher = Hasher::new(method.into())?;

        Ok(Box::new(HashTransform { next, hasher }))
    }
}

/* HashTransform */

struct HashTransform<'a> {
    next: Option<Box<dyn Transform + 'a>>,
    hasher: Hasher,
}

impl<'a> Transform for HashTransform<'a> {
    fn name(&self) -> &str {
        "hash_transform"
    }

    fn next(&self) -> Option<&dyn Transform> {
        self.next.as_deref()
    }

    fn update(&mut self, data: Data) -> Result<(), Error> {
        let data = match &data {
            Data::Binary(data) => data.as_ref(),
            Data::BinaryRaw(data) => data,
            x => return Err(Error::UnexpectedDataType(x.into())),
        };

        self.hasher.update(data)?;

        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<(), Error> {
        let data = self.hasher.finish()?;
        let data = Data::BinaryRaw(data.as_ref());

        let mut next = self.next.ok_or(Error::UnexpectedEndOfChain)?;

        next.update(data)?;

        next.finish()
    }
}

pub const DIGEST_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const DIGEST_SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::transform::ChainBuilder;

    struct Collect(Rc<RefCell<Vec<u8>>>);

    impl<'a> TransformBuilder<'a> for Collect {
        fn input_types(&self) -> DataTypes {
            DataTypes::Binary
        }

        fn build(
            self: Box<Self>,
            _next: Option<Box<dyn Transform + 'a>>,
        ) -> Result<Box<dyn Transform + 'a>, Error> {
            Ok(self)
        }
    }

    impl Transform for Collect {
        fn name(&self) -> &str {
            "collect"
        }

        fn next(&self) -> Option<&dyn Transform> {
            None
        }

        fn update(&mut self, data: Data) -> Result<(), Error> {
            if let Data::BinaryRaw(data) = data {
                self.0.borrow_mut().extend_from_slice(data);
            }

            Ok(())
        }

        fn finish(self: Box<Self>) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn sha1_of_chunked_input() {
        let out = Rc::new(RefCell::new(Vec::new()));

        let mut builder = ChainBuilder::default();
        builder.append(Hash::new(HashMethod::from_algorithm(DIGEST_SHA1).unwrap()));
        builder.append(Collect(out.clone()));

        let mut transform = builder.build().unwrap();
        transform.update(Data::BinaryRaw(b"a")).unwrap();
        transform.update(Data::BinaryRaw(b"bc")).unwrap();
        transform.finish().unwrap();

        assert_eq!(
            base64::encode(&*out.borrow()),
            "qZk+NkcGgWq6PiVxeFDCbJzQ2J0="
        );
    }

    #[test]
    fn unknown_digest_method() {
        assert!(matches!(
            HashMethod::from_algorithm("urn:md5"),
            Err(Error::UnknownDigestMethod(_))
        ));
    }
}
