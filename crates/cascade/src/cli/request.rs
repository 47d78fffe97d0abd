//! `cascade request` handler.

use cascade::{CascadeConfig, CascadeResult, RequestFacade, RequestOptions};

/// Send one prompt and print the response.
pub async fn run_request(
    config: &CascadeConfig,
    prompt: &str,
    tier: Option<&str>,
    options: RequestOptions,
    json: bool,
) -> CascadeResult<()> {
    let facade = RequestFacade::from_config(config).await?;

    if json {
        match facade.request_json(prompt, tier, &options).await? {
            Some(value) => match serde_json::to_string_pretty(&value) {
                Ok(pretty) => println!("{}", pretty),
                Err(_) => println!("{}", value),
            },
            None => {
                eprintln!("Response did not contain JSON");
                std::process::exit(1);
            }
        }
    } else {
        let text = facade.request(prompt, tier, &options).await?;
        println!("{}", text);
    }

    Ok(())
}
