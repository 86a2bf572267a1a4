use crate::models::user::User;

/// Client-side routes the portal redirects between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Auth,
    Dashboard,
    Admin,
    Pricing,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Auth => "/auth",
            Route::Dashboard => "/dashboard",
            Route::Admin => "/admin",
            Route::Pricing => "/pricing",
        }
    }
}

/// Where a visitor of the admin route ends up
pub fn guard_admin_route(user: Option<&User>) -> Route {
    match user {
        Some(user) if user.is_admin => Route::Admin,
        _ => Route::Home,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_stays_on_admin_route() {
        let mut user = User::new(1, "root", "root@example.com");
        user.is_admin = true;
        assert_eq!(guard_admin_route(Some(&user)), Route::Admin);
    }

    #[test]
    fn test_others_redirected_home() {
        let user = User::new(2, "alex", "alex@example.com");
        assert_eq!(guard_admin_route(Some(&user)), Route::Home);
        assert_eq!(guard_admin_route(None), Route::Home);
        assert_eq!(guard_admin_route(None).path(), "/");
    }
}
