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

use std::env::var;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Proxy};
use url::Url;

use crate::error::Error;

use super::{DispenseProposalReturn, Notifier};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts dispense proposal returns to the backbone gateway.
pub struct HttpNotifier {
    client: Client,
    url: Url,
}

impl HttpNotifier {
    pub fn new(url: Url) -> Result<Self, Error> {
        Ok(Self {
            client: create_client()?,
            url,
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, message: &DispenseProposalReturn) -> Result<u16, Error> {
        let body = message.to_xml()?;

        let res = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?;

        Ok(res.status().as_u16())
    }
}

/// Client for the return endpoint. Proxies are taken from `http_proxy` and
/// `https_proxy`.
fn create_client() -> Result<Client, Error> {
    let mut client = Client::builder().timeout(SEND_TIMEOUT);

    if let Ok(url) = var("http_proxy") {
        client = client.proxy(Proxy::http(&url)?);
    }

    if let Ok(url) = var("https_proxy") {
        client = client.proxy(Proxy::https(&url)?);
    }

    Ok(client.build()?)
}
