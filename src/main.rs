#[actix_web::main]
async fn main() {
    if let Err(err) = filiaal_lookup_lib::run().await {
        eprintln!("filiaal-lookup: {}", err);
        std::process::exit(1);
    }
}
