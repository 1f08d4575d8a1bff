use rocket::Route;

mod admin;
mod bot;
mod events;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(bot::routes());
    routes.extend(admin::routes());
    routes.extend(events::routes());
    routes
}
