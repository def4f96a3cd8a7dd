// Copyright (c) 2026 The Chainseal Developers

//! Command line demo client for the chainseal identity and sealing service

use std::path::Path;
use std::time::Duration;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::Utc;
use clap::Parser;
use log::{debug, error, info, warn, LevelFilter};
use rmpv::Value;
use sha2::{Digest, Sha512};
use uuid::Uuid;

use chainseal::{
    api::{ApiHandle, DeviceProperties, DeviceRecord},
    config::Config,
    keystore::KeyStore,
    packet::PayloadType,
    protocol::SealChain,
    transport::{HttpTransport, Transport},
};

mod helpers;
use helpers::*;

/// Chainseal demo command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Config file (auth token, environment, device settings)
    #[clap(long, default_value = "demo.toml")]
    config: String,

    /// Directory for keystore and chain state files
    #[clap(long, default_value = ".")]
    state_dir: String,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Run the full demo sequence
    Run,

    /// Check the auth token and show the account display name
    UserInfo,

    /// Ensure the device identity is registered with the key service
    Register,

    /// Ensure the backend device record exists
    Device,

    /// Send a chained binary message
    Send {
        /// Message payload (utf-8)
        #[clap(long)]
        payload: String,
    },

    /// Seal a payload: only its SHA-512 hash is sent to the backend
    Seal {
        /// Payload to seal (utf-8)
        #[clap(long)]
        payload: String,
    },

    /// Confirm a sealed payload hash with the on-premise validator
    Verify {
        /// hex-encoded SHA-512 payload hash
        #[clap(long)]
        hash: HexData<64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default()).unwrap();

    // Load config, pinning generated device ids for later runs
    let config = Config::load_or_init(&args.config)?;
    let device = config.device.uuid;

    // Open the keystore and restore chain state
    let keystore = KeyStore::load_or_create(
        Path::new(&args.state_dir).join(format!("{}.keys", device.simple())),
    )?;
    let mut chain = SealChain::new(keystore, &args.state_dir, device);

    // Connect to the backend
    let api = ApiHandle::new(
        HttpTransport::new()?,
        &config.service.auth,
        &config.service.env,
    );

    let res = execute(&api, &mut chain, &config, args.cmd).await;

    // Keep the chain tail for the next run
    if let Err(e) = chain.persist() {
        warn!("Failed to persist chain state: {e}");
    }

    res
}

/// Execute a command against the backend
async fn execute<T: Transport>(
    api: &ApiHandle<T>,
    chain: &mut SealChain,
    config: &Config,
    cmd: Actions,
) -> anyhow::Result<()> {
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::Run => run_demo(api, chain, config).await?,
        Actions::UserInfo => {
            let name = api.user_info().await?;
            info!("Authorized as {name}");
        }
        Actions::Register => ensure_identity(api, chain, config.device.uuid).await?,
        Actions::Device => ensure_device(api, config, false).await?,
        Actions::Send { payload } => {
            let message = chain.message_chained(
                &config.device.uuid,
                PayloadType::Binary.into(),
                Value::Binary(payload.into_bytes()),
            )?;
            let ack = api.send(&message).await?;

            info!("{OK}Message accepted ({} byte ack)", ack.len());
        }
        Actions::Seal { payload } => {
            let hash = seal(api, chain, &config.device.uuid, payload.as_bytes()).await?;

            info!(
                "{OK}Sealed payload, hash {}",
                BASE64_STANDARD.encode(hash)
            );
        }
        Actions::Verify { hash } => {
            let proof = api
                .verify_sealed(
                    &config.validator.address,
                    &BASE64_STANDARD.encode(hash.as_ref()),
                )
                .await?;

            info!("Proof: {}", shorten_fields(&proof));
        }
    }

    Ok(())
}

/// Create and register the device identity key if required
async fn ensure_identity<T: Transport>(
    api: &ApiHandle<T>,
    chain: &mut SealChain,
    device: Uuid,
) -> anyhow::Result<()> {
    if chain.keystore().contains(&device) {
        info!("Identity {device} already exists");
        return Ok(());
    }

    chain.keystore_mut().create_keypair(device)?;

    let registration = chain.keystore().registration(&device)?;
    let message = chain.message_signed(
        &device,
        PayloadType::KeyRegistration.into(),
        registration.to_value(),
    )?;

    match api.register_identity(&message).await {
        Ok(()) => info!("{OK}Registered identity {device}"),
        Err(e) => {
            error!("{NOK}Failed to register identity {device}: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Create the backend device record if required
async fn ensure_device<T: Transport>(
    api: &ApiHandle<T>,
    config: &Config,
    settle: bool,
) -> anyhow::Result<()> {
    let device = config.device.uuid;

    if api.device_exists(&device).await? {
        info!("Device {device} already exists");
        return Ok(());
    }

    let record = DeviceRecord {
        device_id: device,
        device_type_key: config.device.device_type.clone(),
        device_name: config.device.name.clone(),
        hw_device_id: config.device.hw_device_id(),
        tags: vec!["milestone-demo".to_string(), "rust-client".to_string()],
        device_properties: DeviceProperties {
            stores_data: true,
            block_chain: false,
        },
        created: Utc::now(),
    };

    match api.device_create(&record).await {
        Ok(()) => info!("{OK}Created device {device}"),
        Err(e) => {
            error!("{NOK}Failed to create device {device}: {e}");
            return Err(e.into());
        }
    }

    if settle {
        // Give the backend time to propagate the new record
        info!("{STEP}Waiting for the device record to settle");
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    Ok(())
}

/// Seal a payload: hash it and send the hash as a chained packet
async fn seal<T: Transport>(
    api: &ApiHandle<T>,
    chain: &mut SealChain,
    device: &Uuid,
    payload: &[u8],
) -> anyhow::Result<[u8; 64]> {
    let hash: [u8; 64] = Sha512::digest(payload).into();

    let message = chain.message_chained(
        device,
        PayloadType::Binary.into(),
        Value::Binary(hash.to_vec()),
    )?;
    let ack = api.send(&message).await?;

    if let Ok(v) = rmpv::decode::read_value(&mut &ack[..]) {
        debug!("Seal acknowledged: {v}");
    }

    Ok(hash)
}

/// Full demo sequence: authorize, register, create, send, seal, validate
async fn run_demo<T: Transport>(
    api: &ApiHandle<T>,
    chain: &mut SealChain,
    config: &Config,
) -> anyhow::Result<()> {
    let device = config.device.uuid;

    // Check the auth token before touching anything else
    info!("{STEP}Checking authorization");
    match api.user_info().await {
        Ok(name) => info!("{OK}Authorized as {name}"),
        Err(e) => {
            error!("{NOK}Not authorized: {e}");
            return Err(e.into());
        }
    }

    // Identity and device record
    info!("{STEP}Checking the device identity");
    ensure_identity(api, chain, device).await?;

    info!("{STEP}Checking the device record");
    ensure_device(api, config, true).await?;

    // Telemetry batch: chained packets of each payload type plus one
    // independent signed packet
    info!("{STEP}Sending demo messages");

    let now_us = Utc::now().timestamp_micros();

    let batch: Vec<(&str, Vec<u8>)> = vec![
        (
            "0x32 (single)",
            chain.message_chained(
                &device,
                PayloadType::SensorReadings.into(),
                Value::Array(vec![
                    Value::from(now_us),
                    Value::from(42),
                    Value::from(1337),
                ]),
            )?,
        ),
        (
            "0x32 (multi) ",
            chain.message_chained(
                &device,
                PayloadType::SensorReadings.into(),
                Value::Array(vec![
                    Value::Array(vec![
                        Value::from(now_us),
                        Value::from(42),
                        Value::from(1337),
                    ]),
                    Value::Array(vec![
                        Value::from(now_us + 1_000_000),
                        Value::from(7),
                        Value::from(666),
                    ]),
                ]),
            )?,
        ),
        (
            "0x53 (json)  ",
            chain.message_chained(
                &device,
                PayloadType::SensorJson.into(),
                Value::Map(vec![
                    (Value::from("message"), Value::from("Hello World!")),
                    (Value::from("foo"), Value::from(42)),
                ]),
            )?,
        ),
        (
            "0x00 (binary)",
            chain.message_chained(
                &device,
                PayloadType::Binary.into(),
                Value::Binary(b"just some bytes".to_vec()),
            )?,
        ),
        (
            "not chained  ",
            chain.message_signed(
                &device,
                PayloadType::Binary.into(),
                Value::Binary(b"some other bytes".to_vec()),
            )?,
        ),
    ];

    let mut all_ok = true;
    for (label, message) in &batch {
        match api.send(message).await {
            Ok(_) => info!("\t{label} {OK}"),
            Err(e) => {
                warn!("\t{label} {NOK}{e}");
                all_ok = false;
            }
        }
    }

    match all_ok {
        true => info!("{OK}Successfully sent all the messages"),
        false => warn!("{NOK}Some messages failed"),
    }

    chain.persist()?;

    // Seal a sensitive reading: only the hash leaves the device
    info!("{STEP}Sealing a sensitive message");

    let reading = sensor_reading(
        &config.device.hw_device_id(),
        Utc::now().timestamp_millis() as u64,
        900.0,
    );
    let reading_b64 = BASE64_STANDARD.encode(&reading);

    match seal(api, chain, &device, &reading).await {
        Ok(_) => info!("{OK}Successfully sealed message {reading_b64}"),
        Err(e) => {
            error!("{NOK}Failed to seal message {reading_b64}: {e}");
            return Err(e);
        }
    }

    info!("{STEP}Waiting for the seal to be processed");
    tokio::time::sleep(Duration::from_secs(2)).await;

    // The receiving side gets the raw payload and confirms it arrived
    // unaltered via the on-premise validator
    info!("{STEP}Validating the message with the on-premise validator");

    let received_hash: [u8; 64] = Sha512::digest(&reading).into();
    match api
        .verify_sealed(
            &config.validator.address,
            &BASE64_STANDARD.encode(received_hash),
        )
        .await
    {
        Ok(proof) => {
            info!("{OK}Message {reading_b64} successfully verified");
            info!(
                "Relevant proof information (shortened): {}",
                shorten_fields(&proof)
            );
        }
        Err(e) => {
            error!("{NOK}Failed to verify the message {reading_b64}: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}
