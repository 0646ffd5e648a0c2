use steam_tradeoffer_agent::{OfferManager, Event, Offer};
use steam_tradeoffer_agent::error::Error;
use owo_colors::OwoColorize;

async fn accept_free_items(manager: &OfferManager, offer: &mut Offer) {
    async fn accept_offer(manager: &OfferManager, offer: &mut Offer) -> Result<(), Error> {
        let outcome = manager.accept_offer(offer, false).await?;

        if outcome == "pending" {
            manager.confirm_offer(offer.id.unwrap()).await
        } else {
            Ok(())
        }
    }

    println!("{} Active", offer.id.unwrap().bright_magenta().bold());
    println!("Receiving: {} items", offer.items_to_receive.len());
    println!("Giving: {} items", offer.items_to_give.len());

    // We're giving something.
    if !offer.items_to_give.is_empty() {
        println!("This offer is not giving us free items - skipping");
        return;
    }

    println!("{}", "This offer is giving us free items - accepting".bright_blue());

    if let Err(error) = accept_offer(manager, offer).await {
        println!("Error accepting offer {}: {error}", offer.id.unwrap());
    } else {
        println!("{} Accepted", offer.id.unwrap().bright_magenta().bold());
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let steamid = std::env::var("STEAMID")?.parse::<u64>()?.into();
    let api_key = std::env::var("API_KEY")?;
    let sessionid = std::env::var("SESSIONID")?;
    let cookies = std::env::var("COOKIES")?
        .split("; ")
        .map(|s| s.to_string())
        .collect::<Vec<_>>();
    let manager = OfferManager::builder(steamid, api_key)
        .identity_secret("secret")
        .cancel_time(30 * 60 * 1000)
        .build();

    manager.set_session(sessionid, &cookies)?;

    let mut rx = manager.start_polling();

    while let Some(event) = rx.recv().await {
        match event {
            Event::NewOffer(mut offer) | Event::ReceivedOfferChanged(mut offer, _) => {
                accept_free_items(&manager, &mut offer).await;
            },
            Event::PollFailure(error) => {
                println!("Error encountered polling offers: {error}");
            },
            _ => {},
        }
    }

    Ok(())
}
