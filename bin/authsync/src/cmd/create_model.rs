//! Publish the embedded authorization model to the store.
use anyhow::Result;

use authsync_conf::Conf;
use authsync_context::Context;
use authsync_fga::FgaClient;
use authsync_fga_http::HttpFga;

use super::CreateModelArgs;

/// IDs of the store and model the embedded model was published to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishedModel {
    pub model_id: String,
    pub store_id: String,
}

/// Publish the embedded authorization model, creating a store if none is configured.
pub async fn run(args: CreateModelArgs, conf: Conf) -> Result<()> {
    let telemetry = crate::init::telemetry(conf.telemetry.clone()).await?;
    let context = Context::root(telemetry.logger.clone()).build();
    let store = &conf.authorization.store;
    let client = FgaClient::from(HttpFga::new(store)?);

    let published = publish(&context, &client, store.store_id.as_deref(), &args.store_name).await?;
    println!("store_id: {}", published.store_id);
    println!("model_id: {}", published.model_id);
    Ok(())
}

/// Write the embedded model to the given store, or to a new store if none is given.
pub async fn publish(
    context: &Context,
    client: &FgaClient,
    store_id: Option<&str>,
    store_name: &str,
) -> Result<PublishedModel> {
    let store_id = match store_id {
        Some(id) => {
            client.set_store_id(context, id);
            id.to_string()
        }
        None => {
            slog::info!(context.logger, "Creating authorization store"; "name" => store_name);
            client.create_store(context, store_name).await?
        }
    };

    let model = authsync_authz::expected_model()?;
    let model_id = client.write_model(context, &model).await?;
    slog::info!(
        context.logger, "Published authorization model";
        "store_id" => &store_id,
        "model_id" => &model_id,
    );
    Ok(PublishedModel { model_id, store_id })
}
