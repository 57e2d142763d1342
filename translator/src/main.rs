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

use std::fs::read_to_string;
use std::path::PathBuf;
use std::sync::Arc;

use log::warn;
use structopt::StructOpt;
use tokio::runtime::Builder;
use url::Url;

use eps_spine_translator::{
    config::{Config, Environment},
    dispatch::{translate, Context, SpineResponse},
    error::Error,
    logging::init_logger,
    notifier::{create_notifier, Outbox},
    verification::TrustStore,
};

fn main() -> Result<(), Error> {
    let opts = Options::from_args();

    init_logger(&opts.log_config)?;

    let trust_store = match &opts.trust_store {
        Some(dir) => Some(Arc::new(TrustStore::from_dir(dir)?)),
        None => {
            warn!("No trust store configured, certificate chain and revocation checks are disabled");

            None
        }
    };

    let config = Config {
        environment: opts.environment.clone(),
        notifier_url: opts.notifier_url.clone(),
        trust_store,
    };
    let response = SpineResponse {
        body: read_to_string(&opts.input)?,
        status_code: opts.status_code,
    };

    let mut runtime = Builder::new().threaded_scheduler().enable_all().build()?;

    runtime.block_on(async move {
        let ctx = Context {
            outbox: Outbox::new(create_notifier(&config)?),
            config: Arc::new(config),
        };

        let res = translate(&response, &ctx).await;
        let json = if opts.pretty {
            serde_json::to_string_pretty(&res)?
        } else {
            serde_json::to_string(&res)?
        };
        println!("{}", json);

        ctx.outbox.flush().await;

        Ok(())
    })
}

#[derive(Clone, StructOpt)]
struct Options {
    /// File containing the raw backbone response.
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    #[structopt(short = "s", long = "status-code", default_value = "200")]
    status_code: u16,

    #[structopt(
        short = "e",
        long = "environment",
        env = "ENVIRONMENT",
        default_value = "internal-dev"
    )]
    environment: Environment,

    #[structopt(short = "n", long = "notifier-url", env = "SPINE_RETURN_URL")]
    notifier_url: Option<Url>,

    /// Directory with the sub-CA certificates and revocation lists used to
    /// check prescriber certificates.
    #[structopt(
        short = "t",
        long = "trust-store",
        env = "TRUST_STORE",
        parse(from_os_str)
    )]
    trust_store: Option<PathBuf>,

    #[structopt(short = "c", long = "log-config", default_value = "./log4rs.yml")]
    log_config: PathBuf,

    #[structopt(short = "p", long = "pretty")]
    pretty: bool,
}
