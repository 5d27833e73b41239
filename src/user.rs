use super::*;
use crate::progress;
use chrono::Utc;

fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() || username.len() > 50 {
        return Err(ErrorKind::UsernameNotValid.into());
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ErrorKind::UsernameNotValid.into());
    }
    Ok(())
}

pub fn get_user_by_name(conn: &PgConnection, username: &str) -> Result<Option<User>> {
    use crate::schema::users;

    Ok(users::table
        .filter(users::username.eq(username))
        .first(conn)
        .optional()
        .chain_err(|| "Error when trying to retrieve user!")?)
}

pub fn list_users(conn: &PgConnection) -> Result<Vec<User>> {
    use crate::schema::users;

    users::table
        .order(users::id.asc())
        .load(conn)
        .chain_err(|| "Can't load users")
}

pub fn add_user(conn: &PgConnection, username: &str) -> Result<User> {
    use crate::schema::users;

    validate_username(username)?;

    if get_user_by_name(conn, username)?.is_some() {
        return Err(ErrorKind::UserExists(username.into()).into());
    }

    let user: User = diesel::insert_into(users::table)
        .values(&NewUser { username })
        .get_result(conn)
        .chain_err(|| "Couldn't create a new user!")?;

    progress::init_for_user(conn, user.id)
        .chain_err(|| "Couldn't initialize word progress for the new user!")?;

    info!("Created a new user, with username {:?}.", username);
    Ok(user)
}

/// Login-or-register: an unknown username creates the user (with its `P0`
/// progress rows); a known one is just returned. The flag tells which.
pub fn get_or_create(conn: &PgConnection, username: &str) -> Result<(User, bool)> {
    if let Some(user) = get_user_by_name(conn, username)? {
        return Ok((user, false));
    }
    let user = add_user(conn, username)?;
    Ok((user, true))
}

pub fn remove_user(conn: &PgConnection, username: &str) -> Result<User> {
    use crate::schema::users;
    use diesel::result::Error::NotFound;

    diesel::delete(users::table.filter(users::username.eq(username)))
        .get_result(conn)
        .map_err(|e| {
            match e {
                NotFound => Error::from_kind(ErrorKind::NoSuchUser(username.into())),
                e => Error::with_chain(e, "Couldn't remove the user!"),
            }
        })
}

pub fn set_last_seen(conn: &PgConnection, user_id: i32) -> Result<()> {
    use crate::schema::users;

    diesel::update(users::table.filter(users::id.eq(user_id)))
        .set(users::last_seen.eq(Utc::now()))
        .execute(conn)?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_validated() {
        assert!(validate_username("aki").is_ok());
        assert!(validate_username("学习者42").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("tabbed\tname").is_err());
        let long: String = ::std::iter::repeat('x').take(51).collect();
        assert!(validate_username(&long).is_err());
    }
}
