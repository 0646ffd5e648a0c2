use steam_tradeoffer_agent::{OfferManager, SteamID};
use steam_tradeoffer_agent::item::Item;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (steamid, api_key, sessionid, cookies) = get_session();
    let steamid_other = get_steamid("STEAMID_OTHER");
    let manager = OfferManager::new(steamid, api_key);

    manager.set_session(sessionid, &cookies)?;

    let mut offer = manager.new_offer(steamid_other, None)?;

    offer.add_their_item(Item::new(440, 2, 11482399896, 1))?;

    manager.send_offer(&mut offer).await?;

    println!("Sent offer #{}", offer.id.unwrap());

    Ok(())
}

fn get_steamid(key: &str) -> SteamID {
    let sid_str = std::env::var(key)
        .unwrap_or_else(|_| panic!("{} missing", key));
    
    SteamID::from(sid_str.parse::<u64>().unwrap())
}

/// Gets session from environment variable.
fn get_session() -> (SteamID, String, String, Vec<String>) {
    dotenv::dotenv().ok();
    
    let api_key = std::env::var("API_KEY").expect("API_KEY missing");
    let steamid = get_steamid("STEAMID");
    let mut sessionid = None;
    let mut cookies: Vec<String> = Vec::new();
    let cookies_str = std::env::var("COOKIES")
        .expect("COOKIES missing");
    
    for cookie in cookies_str.split('&') {
        let mut split = cookie.split('=');
        
        if split.next().unwrap() == "sessionid" {
            sessionid = Some(split.next().unwrap().to_string());
        }
        
        cookies.push(cookie.to_string());
    }
    
    (steamid, api_key, sessionid.unwrap(), cookies)
}