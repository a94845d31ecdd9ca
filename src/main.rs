use chainconsent::prelude::*;

#[cfg(not(feature = "rpc"))]
fn main() -> ChainConsentResult<()> {
    Err(ChainConsentError::from("built without the rpc feature, no node to talk to"))
}

#[cfg(feature = "rpc")]
#[tokio::main]
async fn main() -> ChainConsentResult<()> {
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::DEBUG.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();
    tracing::debug!("running chainconsent {}", full_version());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::Command::parse(&args)?;

    let config = SessionConfig::from_env()?;
    let output = cli::run(command, &config).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

#[cfg(feature = "rpc")]
mod cli {
    use std::str::FromStr;
    use std::sync::Arc;
    use std::time::Duration;

    use chainconsent::prelude::*;
    use chainconsent::Address;
    use serde_json::{json, Value};

    const USAGE: &str = "usage: chainconsent <command>
  status
  accounts
  show <record>
  create <subject> <controller> <recipient,...> <data-flags> <duration-secs> [purpose,...]
  grant <record> <signer>
  revoke <record> <signer>
  authorize <record> <recipient> <data-flags>
  add-delegate <record> <subject> <delegate>
  remove-delegate <record> <subject> <delegate>
  receipt <tx-hash>";

    pub enum Command {
        Accounts,
        AddDelegate(Address, Identity, Identity),
        Authorize(Address, Identity, DataFlags),
        Create(Identity, ConsentTerms),
        Grant(Address, Identity),
        Receipt(TxHash),
        RemoveDelegate(Address, Identity, Identity),
        Revoke(Address, Identity),
        Show(Address),
        Status,
    }

    impl Command {
        pub fn parse(args: &[String]) -> ChainConsentResult<Self> {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();

            let command = match args.as_slice() {
                ["status"] => Command::Status,
                ["accounts"] => Command::Accounts,
                ["show", record] => Command::Show(parse(record)?),
                ["grant", record, signer] => Command::Grant(parse(record)?, parse(signer)?),
                ["revoke", record, signer] => Command::Revoke(parse(record)?, parse(signer)?),
                ["authorize", record, recipient, data] => {
                    Command::Authorize(parse(record)?, parse(recipient)?, parse_flags(data)?)
                }
                ["add-delegate", record, subject, delegate] => {
                    Command::AddDelegate(parse(record)?, parse(subject)?, parse(delegate)?)
                }
                ["remove-delegate", record, subject, delegate] => {
                    Command::RemoveDelegate(parse(record)?, parse(subject)?, parse(delegate)?)
                }
                ["receipt", tx_hash] => Command::Receipt(parse(tx_hash)?),
                ["create", subject, controller, recipients, data, duration, rest @ ..]
                    if rest.len() <= 1 =>
                {
                    let recipients = parse_list::<Identity>(recipients)?;
                    let purposes = match rest {
                        [purposes] => parse_list::<u8>(purposes)?,
                        _ => Vec::new(),
                    };

                    let terms = ConsentTerms::new(
                        parse(controller)?,
                        recipients,
                        parse_flags(data)?,
                        Duration::from_secs(parse(duration)?),
                        purposes.into_iter().map(Purpose::from_code),
                    )
                    .map_err(|err| ChainConsentError::from(err.to_string()))?;

                    Command::Create(parse(subject)?, terms)
                }
                _ => return Err(ChainConsentError::from(USAGE)),
            };

            Ok(command)
        }
    }

    pub async fn run(command: Command, config: &SessionConfig) -> ChainConsentResult<Value> {
        let connector = Arc::new(RpcConnector::with_request_timeout(
            config.endpoint.clone(),
            config.request_timeout,
        )?);
        let network_id = connector.network_id().await?;

        let deployment = config.loader().resolve(&config.contract_name, &network_id).await?;
        let session = ConsentSession::new(
            connector,
            deployment.interface().clone(),
            config.submit_policy(),
        );

        let output = match command {
            Command::Status => {
                let status = session.network_status().await?;
                json!({
                    "network_id": status.network_id,
                    "block_number": status.block_number,
                    "contract": config.contract_name,
                    "latest_record": session
                        .attach_latest(&deployment)
                        .map(|handle| handle.to_string()),
                    "version": minimal_version(),
                })
            }
            Command::Accounts => {
                let accounts = session.accounts().await?;
                json!(accounts.iter().map(ToString::to_string).collect::<Vec<_>>())
            }
            Command::Show(record) => view_json(&session.snapshot(session.attach(record)).await?),
            Command::Create(subject, terms) => {
                let handle = session.create(subject, &terms).await?;
                view_json(&session.snapshot(handle).await?)
            }
            Command::Grant(record, signer) => {
                ack_json(&session.grant(session.attach(record), signer).await?)
            }
            Command::Revoke(record, signer) => {
                ack_json(&session.revoke(session.attach(record), signer).await?)
            }
            Command::Authorize(record, recipient, data) => {
                let authorized = session.authorize(session.attach(record), recipient, data).await?;
                json!({
                    "recipient": recipient.to_string(),
                    "data": data.to_string(),
                    "authorized": authorized,
                })
            }
            Command::AddDelegate(record, subject, delegate) => {
                ack_json(&session.add_delegate(session.attach(record), subject, delegate).await?)
            }
            Command::RemoveDelegate(record, subject, delegate) => {
                ack_json(&session.remove_delegate(session.attach(record), subject, delegate).await?)
            }
            Command::Receipt(tx_hash) => match session.receipt(tx_hash).await? {
                Some(receipt) => json!({
                    "tx_hash": receipt.transaction_hash.to_string(),
                    "block_number": receipt.block_number,
                    "succeeded": receipt.succeeded(),
                    "gas_used": receipt.gas_used,
                }),
                None => json!({ "tx_hash": tx_hash.to_string(), "pending": true }),
            },
        };

        Ok(output)
    }

    fn ack_json(ack: &Ack) -> Value {
        json!({
            "tx_hash": ack.tx_hash.to_string(),
            "block_number": ack.block_number,
            "gas_used": ack.gas_used,
        })
    }

    fn parse<T>(raw: &str) -> ChainConsentResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.parse()
            .map_err(|err| ChainConsentError::from(format!("invalid argument {raw:?}: {err}")))
    }

    fn parse_flags(raw: &str) -> ChainConsentResult<DataFlags> {
        let bits = match raw.strip_prefix("0b") {
            Some(binary) => u32::from_str_radix(binary, 2).map_err(|err| {
                ChainConsentError::from(format!("invalid data flags {raw:?}: {err}"))
            })?,
            None => parse(raw)?,
        };

        Ok(DataFlags::from_bits(bits))
    }

    fn parse_list<T>(raw: &str) -> ChainConsentResult<Vec<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(parse)
            .collect()
    }

    fn view_json(view: &ConsentView) -> Value {
        json!({
            "address": view.address.to_string(),
            "valid": view.valid,
            "consent_from_ds": view.consent_from_ds,
            "consent_from_dc": view.consent_from_dc,
            "data_subject": view.data_subject.to_string(),
            "controller": view.controller.to_string(),
            "data": view.data.to_string(),
            "duration_secs": view.duration.as_secs(),
        })
    }
}
