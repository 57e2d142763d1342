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

use resources::{
    primitives::{DateTime, Id},
    provenance::{Agent, Signature},
    types::{Coding, Reference},
    Provenance,
};
use xmldoc::{C14nMode, Element};

use crate::error::Error;

use super::common::new_id;

const SYSTEM_SIGNATURE_TYPE: &str = "urn:iso-astm:E1762-95:2013";

/// Provenance of a signed prescription, targeting every other resource of
/// the bundle.
pub fn create_provenance(
    signature: &Element,
    signed_at: DateTime,
    author: Reference,
    targets: &[&Id],
) -> Result<Provenance, Error> {
    let data = signature.to_c14n_string(C14nMode::Inclusive)?;

    Ok(Provenance {
        id: new_id()?,
        target: targets.iter().map(|id| Reference::to(id)).collect(),
        recorded: signed_at.clone(),
        agent: vec![Agent {
            who: author.clone(),
        }],
        signature: vec![Signature {
            type_: vec![Coding::new(
                SYSTEM_SIGNATURE_TYPE,
                "1.2.840.10065.1.12.1.1",
                Some("Author's Signature".into()),
            )],
            when: signed_at,
            who: author,
            data: base64::encode(data),
        }],
    })
}
