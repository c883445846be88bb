use crate::model::*;
use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree, Transactional,
};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("encoding error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("corrupt record: {0}")]
    Corrupt(&'static str),
}

impl From<TransactionError<DbError>> for DbError {
    fn from(err: TransactionError<DbError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => DbError::Storage(e),
        }
    }
}

type TxResult<T> = Result<T, ConflictableTransactionError<DbError>>;

fn abort<E: Into<DbError>>(err: E) -> ConflictableTransactionError<DbError> {
    ConflictableTransactionError::Abort(err.into())
}

// Big-endian so that iterating the users tree yields registration order.
fn serialize_id(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn deserialize_id<V: AsRef<[u8]>>(id: V) -> Result<u64, DbError> {
    use std::convert::TryInto;
    let bytes: [u8; 8] = id
        .as_ref()
        .try_into()
        .map_err(|_| DbError::Corrupt("user id is not 8 bytes"))?;
    Ok(u64::from_be_bytes(bytes))
}

fn encode(user: &User) -> Result<Vec<u8>, DbError> {
    Ok(bincode::serialize(user)?)
}

fn decode(raw: &[u8]) -> Result<User, DbError> {
    Ok(bincode::deserialize(raw)?)
}

pub trait UserDb {
    /// Stores a new user. Returns `None` if the username (or Google id) is
    /// already taken, leaving the existing account untouched.
    fn add_user(&self, user: &User) -> Result<Option<u64>, DbError>;
    fn get_user(&self, id: u64) -> Result<Option<User>, DbError>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<(u64, User)>, DbError>;
    /// Finds the account linked to `google_id` or creates it with
    /// `display_name` as username. `None` means the name belongs to another
    /// account.
    fn find_or_create_google_user(
        &self,
        google_id: &str,
        display_name: &str,
    ) -> Result<Option<(u64, User)>, DbError>;
    fn all_users(&self) -> Result<Vec<(u64, User)>, DbError>;
    /// Appends `record` to the matching list of user `id`. Returns the updated
    /// user, or `None` if there is no such user.
    fn append_record(&self, id: u64, record: &MediaRecord) -> Result<Option<User>, DbError>;
}

const USERS: &[u8] = b"users";
const USERS_USERNAME: &[u8] = b"users_username";
const USERS_GOOGLE: &[u8] = b"users_google";

fn insert_indexed(
    users: &TransactionalTree,
    users_username: &TransactionalTree,
    users_google: &TransactionalTree,
    user: &User,
) -> TxResult<Option<u64>> {
    if users_username.get(user.username.as_bytes())?.is_some() {
        return Ok(None);
    }
    if let Some(google_id) = &user.google_id {
        if users_google.get(google_id.as_bytes())?.is_some() {
            return Ok(None);
        }
    }
    let id = users.generate_id()?;
    let key = serialize_id(id);
    users.insert(&key[..], encode(user).map_err(abort)?)?;
    users_username.insert(user.username.as_bytes(), &key[..])?;
    if let Some(google_id) = &user.google_id {
        users_google.insert(google_id.as_bytes(), &key[..])?;
    }
    Ok(Some(id))
}

impl UserDb for sled::Db {
    fn add_user(&self, user: &User) -> Result<Option<u64>, DbError> {
        let users = self.open_tree(USERS)?;
        let users_username = self.open_tree(USERS_USERNAME)?;
        let users_google = self.open_tree(USERS_GOOGLE)?;
        let id = (&users, &users_username, &users_google).transaction(
            |(users, users_username, users_google)| {
                insert_indexed(users, users_username, users_google, user)
            },
        )?;
        Ok(id)
    }

    fn get_user(&self, id: u64) -> Result<Option<User>, DbError> {
        let users = self.open_tree(USERS)?;
        users
            .get(serialize_id(id))?
            .map(|raw| decode(&raw))
            .transpose()
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<(u64, User)>, DbError> {
        let users_username = self.open_tree(USERS_USERNAME)?;
        let users = self.open_tree(USERS)?;
        let id = match users_username.get(username)? {
            Some(id) => id,
            None => return Ok(None),
        };
        let raw = users
            .get(&id)?
            .ok_or(DbError::Corrupt("users_username points at a missing user"))?;
        Ok(Some((deserialize_id(&id)?, decode(&raw)?)))
    }

    fn find_or_create_google_user(
        &self,
        google_id: &str,
        display_name: &str,
    ) -> Result<Option<(u64, User)>, DbError> {
        let users = self.open_tree(USERS)?;
        let users_username = self.open_tree(USERS_USERNAME)?;
        let users_google = self.open_tree(USERS_GOOGLE)?;
        let found = (&users, &users_username, &users_google).transaction(
            |(users, users_username, users_google)| -> TxResult<Option<(u64, User)>> {
                if let Some(key) = users_google.get(google_id.as_bytes())? {
                    let id = deserialize_id(&key).map_err(abort)?;
                    let raw = users.get(&key)?.ok_or_else(|| {
                        abort(DbError::Corrupt("users_google points at a missing user"))
                    })?;
                    return Ok(Some((id, decode(&raw).map_err(abort)?)));
                }
                let user = User::google(display_name.to_owned(), google_id.to_owned());
                let id = insert_indexed(users, users_username, users_google, &user)?;
                Ok(id.map(|id| (id, user)))
            },
        )?;
        Ok(found)
    }

    fn all_users(&self) -> Result<Vec<(u64, User)>, DbError> {
        let users = self.open_tree(USERS)?;
        users
            .iter()
            .map(|entry| -> Result<(u64, User), DbError> {
                let (key, raw) = entry?;
                Ok((deserialize_id(&key)?, decode(&raw)?))
            })
            .collect()
    }

    fn append_record(&self, id: u64, record: &MediaRecord) -> Result<Option<User>, DbError> {
        let users = self.open_tree(USERS)?;
        let key = serialize_id(id);
        let updated = users.transaction(|users| -> TxResult<Option<User>> {
            let raw = match users.get(&key[..])? {
                Some(raw) => raw,
                None => return Ok(None),
            };
            let mut user = decode(&raw).map_err(abort)?;
            user.push(record.clone());
            users.insert(&key[..], encode(&user).map_err(abort)?)?;
            Ok(Some(user))
        })?;
        Ok(updated)
    }
}
