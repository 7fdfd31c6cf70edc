use keyvault_secret::{get_secret, KeyVaultSettings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let keyvault_name = "my-keyvault";

    // App id and secret are empty, so the default credential chain authenticates.
    let settings = KeyVaultSettings::new("", "", "");

    let secret = get_secret(&settings, keyvault_name, "test").await?;
    dbg!(&secret);

    Ok(())
}
