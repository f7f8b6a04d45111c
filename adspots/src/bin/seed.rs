//! Seeds a running Ad Spots server through its REST API.
use clap::{crate_version, Arg, Command};
use primitives::{
    ad_spot::CreateAdSpot, api::DeactivateResponse, util::logging::new_logger, AdSpot, Placement,
};
use reqwest::Client;
use slog::info;

const PLACEMENTS: [Placement; 3] = [
    Placement::HomeScreen,
    Placement::RideSummary,
    Placement::MapView,
];

/// Cycled through the seeded ad spots, `Some(0)` never expires.
const TTL_MINUTES: [Option<u32>; 4] = [None, Some(30), Some(120), Some(0)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Command::new("seed")
        .version(crate_version!())
        .arg(
            Arg::new("url")
                .long("url")
                .help("the Ad Spots server")
                .takes_value(true)
                .default_value("http://127.0.0.1:8081"),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .help("how many ad spots to create, every 4th is deactivated")
                .takes_value(true)
                .default_value("10"),
        )
        .get_matches();

    let url = cli.value_of("url").unwrap_or_default().trim_end_matches('/');
    let count = cli.value_of_t::<usize>("count")?;

    let logger = new_logger("seed");
    let client = Client::new();

    for n in 0..count {
        let request = CreateAdSpot {
            title: Some(format!("Seeded ad spot #{}", n + 1)),
            image_url: Some(format!("https://picsum.photos/seed/{}/600/300", n + 1)),
            placement: Some(PLACEMENTS[n % PLACEMENTS.len()].to_string()),
            ttl_minutes: TTL_MINUTES[n % TTL_MINUTES.len()],
        };

        let ad_spot = create_ad_spot(&client, url, &request).await?;
        info!(&logger, "Created ad spot"; "id" => &ad_spot.id, "placement" => %ad_spot.placement);

        if n % 4 == 3 {
            let deactivated = deactivate_ad_spot(&client, url, &ad_spot.id).await?;
            info!(&logger, "{}", deactivated.message; "id" => &deactivated.id);
        }
    }

    Ok(())
}

async fn create_ad_spot(
    client: &Client,
    url: &str,
    request: &CreateAdSpot,
) -> Result<AdSpot, reqwest::Error> {
    client
        .post(format!("{url}/adspots"))
        .json(request)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

async fn deactivate_ad_spot(
    client: &Client,
    url: &str,
    id: &str,
) -> Result<DeactivateResponse, reqwest::Error> {
    client
        .post(format!("{url}/adspots/{id}/deactivate"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}
