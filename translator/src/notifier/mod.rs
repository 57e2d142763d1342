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

mod dispense_proposal_return;
mod http;

pub use dispense_proposal_return::*;
pub use http::HttpNotifier;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use log::{error, info};
use tokio::{spawn, sync::Mutex, task::JoinHandle};

use crate::{config::Config, error::Error};

/// Outbound channel for dispense proposal returns.
#[async_trait]
pub trait Notifier {
    async fn send(&self, message: &DispenseProposalReturn) -> Result<u16, Error>;
}

/// Notifier that only logs the returns it is given.
#[derive(Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, message: &DispenseProposalReturn) -> Result<u16, Error> {
        info!(
            "Discarding return {} for prescription {}",
            message.id, message.prescription_id
        );

        Ok(200)
    }
}

/// Creates the notifier configured by `config`.
pub fn create_notifier(config: &Config) -> Result<Arc<dyn Notifier + Send + Sync>, Error> {
    match &config.notifier_url {
        Some(url) => Ok(Arc::new(HttpNotifier::new(url.clone())?)),
        None => Ok(Arc::new(NullNotifier)),
    }
}

/* Outbox */

/// Sends returns in the background. Every send runs as its own task, so a
/// failing send neither blocks the response nor affects the other sends.
#[derive(Clone)]
pub struct Outbox(Arc<Inner>);

struct Inner {
    notifier: Arc<dyn Notifier + Send + Sync>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl Outbox {
    pub fn new(notifier: Arc<dyn Notifier + Send + Sync>) -> Self {
        Self(Arc::new(Inner {
            notifier,
            pending: Mutex::new(Vec::new()),
        }))
    }

    pub async fn post(&self, returns: Vec<DispenseProposalReturn>) {
        let mut pending = self.0.pending.lock().await;

        for message in returns {
            let notifier = self.0.notifier.clone();

            pending.push(spawn(async move {
                match notifier.send(&message).await {
                    Ok(status) => info!(
                        "Sent return {} for prescription {} (status {})",
                        message.id, message.prescription_id, status
                    ),
                    Err(err) => error!(
                        "Unable to send return {} for prescription {}: {}",
                        message.id, message.prescription_id, err
                    ),
                }
            }));
        }
    }

    /// Waits for all sends posted so far.
    pub async fn flush(&self) {
        let pending = std::mem::take(&mut *self.0.pending.lock().await);

        for res in join_all(pending).await {
            if let Err(err) = res {
                error!("Return task failed: {}", err);
            }
        }
    }
}
