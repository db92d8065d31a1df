use crate::core::key_template::value_text;
use crate::domain::ports::StoreClient;
use crate::utils::error::{KeeperError, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const NOT_INTEGER: &str = "ERR value is not an integer or out of range";

#[derive(Debug, Clone)]
enum Entry {
    Str(String),
    Hash(BTreeMap<String, String>),
    List(VecDeque<String>),
    Set(BTreeSet<String>),
    ZSet(BTreeMap<String, f64>),
}

impl Entry {
    fn type_name(&self) -> &'static str {
        match self {
            Entry::Str(_) => "string",
            Entry::Hash(_) => "hash",
            Entry::List(_) => "list",
            Entry::Set(_) => "set",
            Entry::ZSet(_) => "zset",
        }
    }
}

/// In-process store speaking a subset of the redis command vocabulary.
///
/// Replies follow redis conventions mapped onto JSON: integers for counts,
/// strings for values, `null` for missing values, arrays for multi-bulk.
/// Hash `hgetall` returns an object. Commands outside the subset fail with a
/// `Store` error. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<String, Entry>>>,
    issued: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commands that reached the store.
    pub fn commands_issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    pub async fn keys(&self) -> Vec<String> {
        let data = self.data.lock().await;
        let mut keys: Vec<String> = data.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn command(&self, name: &str, key: &str, args: Vec<Value>) -> Result<Value> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        let args: Vec<String> = args.iter().map(value_text).collect();
        let mut data = self.data.lock().await;
        apply(&mut data, name, key, &args)
    }
}

fn apply(data: &mut HashMap<String, Entry>, name: &str, key: &str, args: &[String]) -> Result<Value> {
    let cmd = Cmd { name, args };
    match name {
        // keys
        "del" => Ok(json!(data.remove(key).is_some() as i64)),
        "exists" => Ok(json!(data.contains_key(key) as i64)),
        "type" => Ok(json!(data.get(key).map(Entry::type_name).unwrap_or("none"))),
        "ttl" | "pttl" => Ok(json!(if data.contains_key(key) { -1 } else { -2 })),
        "rename" | "renamenx" => {
            let target = cmd.arg(0)?;
            if name == "renamenx" && data.contains_key(target) {
                return Ok(json!(0));
            }
            let entry = data
                .remove(key)
                .ok_or_else(|| KeeperError::store(name, "ERR no such key"))?;
            data.insert(target.to_string(), entry);
            Ok(if name == "rename" { json!("OK") } else { json!(1) })
        }

        // strings
        "get" => match data.get(key) {
            None => Ok(Value::Null),
            Some(Entry::Str(s)) => Ok(json!(s)),
            Some(_) => Err(cmd.wrong_type()),
        },
        "set" => {
            data.insert(key.to_string(), Entry::Str(cmd.arg(0)?.to_string()));
            Ok(json!("OK"))
        }
        "setnx" => {
            if data.contains_key(key) {
                return Ok(json!(0));
            }
            data.insert(key.to_string(), Entry::Str(cmd.arg(0)?.to_string()));
            Ok(json!(1))
        }
        "getset" => {
            let value = cmd.arg(0)?.to_string();
            match data.insert(key.to_string(), Entry::Str(value)) {
                None => Ok(Value::Null),
                Some(Entry::Str(old)) => Ok(json!(old)),
                Some(other) => {
                    data.insert(key.to_string(), other);
                    Err(cmd.wrong_type())
                }
            }
        }
        "append" | "strlen" => {
            let suffix = if name == "append" { cmd.arg(0)? } else { "" };
            let entry = data
                .entry(key.to_string())
                .or_insert_with(|| Entry::Str(String::new()));
            let Entry::Str(s) = entry else {
                return Err(cmd.wrong_type());
            };
            s.push_str(suffix);
            let len = s.len();
            if len == 0 {
                data.remove(key);
            }
            Ok(json!(len))
        }
        "incr" | "decr" | "incrby" | "decrby" => {
            let step = match name {
                "incr" => 1,
                "decr" => -1,
                "incrby" => cmd.int(0)?,
                _ => cmd
                    .int(0)?
                    .checked_neg()
                    .ok_or_else(|| KeeperError::store(name, NOT_INTEGER))?,
            };
            let current = match data.get(key) {
                None => 0,
                Some(Entry::Str(s)) => s
                    .parse::<i64>()
                    .map_err(|_| KeeperError::store(name, NOT_INTEGER))?,
                Some(_) => return Err(cmd.wrong_type()),
            };
            let next = current
                .checked_add(step)
                .ok_or_else(|| KeeperError::store(name, NOT_INTEGER))?;
            data.insert(key.to_string(), Entry::Str(next.to_string()));
            Ok(json!(next))
        }

        // hashes
        "hset" | "hmset" | "hsetnx" => {
            let pairs = cmd.pairs()?;
            let hash = hash_mut(data, key, &cmd)?;
            let mut added = 0;
            for (field, value) in pairs {
                if name == "hsetnx" && hash.contains_key(field) {
                    continue;
                }
                if hash.insert(field.to_string(), value.to_string()).is_none() {
                    added += 1;
                }
            }
            Ok(if name == "hmset" { json!("OK") } else { json!(added) })
        }
        "hget" => {
            let field = cmd.arg(0)?;
            Ok(hash_ref(data, key, &cmd)?
                .and_then(|h| h.get(field).cloned())
                .map_or(Value::Null, Value::String))
        }
        "hmget" => {
            let hash = hash_ref(data, key, &cmd)?;
            Ok(Value::Array(
                args.iter()
                    .map(|field| {
                        hash.and_then(|h| h.get(field).cloned())
                            .map_or(Value::Null, Value::String)
                    })
                    .collect(),
            ))
        }
        "hgetall" => {
            let mut out = Map::new();
            if let Some(hash) = hash_ref(data, key, &cmd)? {
                for (field, value) in hash {
                    out.insert(field.clone(), json!(value));
                }
            }
            Ok(Value::Object(out))
        }
        "hdel" => {
            let mut removed = 0;
            if let Some(Entry::Hash(hash)) = data.get_mut(key) {
                for field in args {
                    if hash.remove(field).is_some() {
                        removed += 1;
                    }
                }
                if hash.is_empty() {
                    data.remove(key);
                }
            } else if data.contains_key(key) {
                return Err(cmd.wrong_type());
            }
            Ok(json!(removed))
        }
        "hexists" => {
            let field = cmd.arg(0)?;
            let found = hash_ref(data, key, &cmd)?.is_some_and(|h| h.contains_key(field));
            Ok(json!(found as i64))
        }
        "hlen" => Ok(json!(hash_ref(data, key, &cmd)?.map_or(0, BTreeMap::len))),
        "hkeys" | "hvals" => {
            let hash = hash_ref(data, key, &cmd)?;
            let items: Vec<Value> = hash
                .into_iter()
                .flatten()
                .map(|(field, value)| json!(if name == "hkeys" { field } else { value }))
                .collect();
            Ok(Value::Array(items))
        }
        "hincrby" => {
            let field = cmd.arg(0)?.to_string();
            let step = cmd.int(1)?;
            let hash = hash_mut(data, key, &cmd)?;
            let current = match hash.get(&field) {
                None => 0,
                Some(v) => v
                    .parse::<i64>()
                    .map_err(|_| KeeperError::store(name, NOT_INTEGER))?,
            };
            let next = current
                .checked_add(step)
                .ok_or_else(|| KeeperError::store(name, NOT_INTEGER))?;
            hash.insert(field, next.to_string());
            Ok(json!(next))
        }

        // lists
        "lpush" | "rpush" => {
            if args.is_empty() {
                return Err(cmd.arity());
            }
            let entry = data
                .entry(key.to_string())
                .or_insert_with(|| Entry::List(VecDeque::new()));
            let Entry::List(list) = entry else {
                return Err(cmd.wrong_type());
            };
            for value in args {
                if name == "lpush" {
                    list.push_front(value.clone());
                } else {
                    list.push_back(value.clone());
                }
            }
            Ok(json!(list.len()))
        }
        "lpop" | "rpop" => {
            let popped = match data.get_mut(key) {
                None => None,
                Some(Entry::List(list)) => {
                    if name == "lpop" {
                        list.pop_front()
                    } else {
                        list.pop_back()
                    }
                }
                Some(_) => return Err(cmd.wrong_type()),
            };
            if matches!(data.get(key), Some(Entry::List(list)) if list.is_empty()) {
                data.remove(key);
            }
            Ok(popped.map_or(Value::Null, Value::String))
        }
        "llen" => match data.get(key) {
            None => Ok(json!(0)),
            Some(Entry::List(list)) => Ok(json!(list.len())),
            Some(_) => Err(cmd.wrong_type()),
        },
        "lrange" => {
            let (start, stop) = (cmd.int(0)?, cmd.int(1)?);
            match data.get(key) {
                None => Ok(json!([])),
                Some(Entry::List(list)) => Ok(Value::Array(
                    slice_range(list.len(), start, stop)
                        .map(|i| json!(list[i]))
                        .collect(),
                )),
                Some(_) => Err(cmd.wrong_type()),
            }
        }
        "lindex" => {
            let index = cmd.int(0)?;
            match data.get(key) {
                None => Ok(Value::Null),
                Some(Entry::List(list)) => Ok(resolve_index(list.len(), index)
                    .map_or(Value::Null, |i| json!(list[i]))),
                Some(_) => Err(cmd.wrong_type()),
            }
        }

        // sets
        "sadd" => {
            if args.is_empty() {
                return Err(cmd.arity());
            }
            let entry = data
                .entry(key.to_string())
                .or_insert_with(|| Entry::Set(BTreeSet::new()));
            let Entry::Set(set) = entry else {
                return Err(cmd.wrong_type());
            };
            let added = args.iter().filter(|m| set.insert((*m).clone())).count();
            Ok(json!(added))
        }
        "srem" => {
            let mut removed = 0;
            if let Some(Entry::Set(set)) = data.get_mut(key) {
                removed = args.iter().filter(|m| set.remove(m.as_str())).count();
                if set.is_empty() {
                    data.remove(key);
                }
            } else if data.contains_key(key) {
                return Err(cmd.wrong_type());
            }
            Ok(json!(removed))
        }
        "smembers" | "scard" | "sismember" => {
            let set = match data.get(key) {
                None => None,
                Some(Entry::Set(set)) => Some(set),
                Some(_) => return Err(cmd.wrong_type()),
            };
            match name {
                "smembers" => Ok(Value::Array(
                    set.into_iter().flatten().map(|m| json!(m)).collect(),
                )),
                "scard" => Ok(json!(set.map_or(0, BTreeSet::len))),
                _ => {
                    let member = cmd.arg(0)?;
                    Ok(json!(set.is_some_and(|s| s.contains(member)) as i64))
                }
            }
        }

        // sorted sets
        "zadd" | "zincrby" => {
            let pairs = cmd.pairs()?;
            let mut parsed = Vec::with_capacity(pairs.len());
            for (score, member) in pairs {
                let score = score
                    .parse::<f64>()
                    .map_err(|_| KeeperError::store(name, "ERR value is not a valid float"))?;
                parsed.push((score, member));
            }
            let entry = data
                .entry(key.to_string())
                .or_insert_with(|| Entry::ZSet(BTreeMap::new()));
            let Entry::ZSet(zset) = entry else {
                return Err(cmd.wrong_type());
            };
            if name == "zincrby" {
                let (step, member) = parsed.first().ok_or_else(|| cmd.arity())?;
                let score = zset.entry(member.to_string()).or_insert(0.0);
                *score += step;
                return Ok(json!(format_score(*score)));
            }
            let added = parsed
                .into_iter()
                .filter(|(score, member)| zset.insert(member.to_string(), *score).is_none())
                .count();
            Ok(json!(added))
        }
        "zscore" | "zcard" | "zrank" | "zrange" => {
            let zset = match data.get(key) {
                None => None,
                Some(Entry::ZSet(zset)) => Some(zset),
                Some(_) => return Err(cmd.wrong_type()),
            };
            let ordered = || {
                let mut members: Vec<(&String, f64)> =
                    zset.into_iter().flatten().map(|(m, s)| (m, *s)).collect();
                members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
                members
            };
            match name {
                "zscore" => {
                    let member = cmd.arg(0)?;
                    Ok(zset
                        .and_then(|z| z.get(member))
                        .map_or(Value::Null, |s| json!(format_score(*s))))
                }
                "zcard" => Ok(json!(zset.map_or(0, BTreeMap::len))),
                "zrank" => {
                    let member = cmd.arg(0)?;
                    Ok(ordered()
                        .iter()
                        .position(|(m, _)| m.as_str() == member)
                        .map_or(Value::Null, |i| json!(i)))
                }
                _ => {
                    let (start, stop) = (cmd.int(0)?, cmd.int(1)?);
                    let members = ordered();
                    Ok(Value::Array(
                        slice_range(members.len(), start, stop)
                            .map(|i| json!(members[i].0))
                            .collect(),
                    ))
                }
            }
        }
        "zrem" => {
            let mut removed = 0;
            if let Some(Entry::ZSet(zset)) = data.get_mut(key) {
                removed = args.iter().filter(|m| zset.remove(m.as_str()).is_some()).count();
                if zset.is_empty() {
                    data.remove(key);
                }
            } else if data.contains_key(key) {
                return Err(cmd.wrong_type());
            }
            Ok(json!(removed))
        }

        _ => Err(KeeperError::store(name, "ERR command not supported by the memory store")),
    }
}

struct Cmd<'a> {
    name: &'a str,
    args: &'a [String],
}

impl<'a> Cmd<'a> {
    fn arg(&self, index: usize) -> Result<&'a str> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.arity())
    }

    fn int(&self, index: usize) -> Result<i64> {
        self.arg(index)?
            .parse()
            .map_err(|_| KeeperError::store(self.name, NOT_INTEGER))
    }

    /// Arguments as `(a, b)` pairs; at least one pair, no leftovers.
    fn pairs(&self) -> Result<Vec<(&'a str, &'a str)>> {
        if self.args.is_empty() || self.args.len() % 2 != 0 {
            return Err(self.arity());
        }
        Ok(self
            .args
            .chunks(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
            .collect())
    }

    fn arity(&self) -> KeeperError {
        KeeperError::store(
            self.name,
            format!("ERR wrong number of arguments for '{}' command", self.name),
        )
    }

    fn wrong_type(&self) -> KeeperError {
        KeeperError::store(self.name, WRONGTYPE)
    }
}

fn hash_ref<'d>(
    data: &'d HashMap<String, Entry>,
    key: &str,
    cmd: &Cmd<'_>,
) -> Result<Option<&'d BTreeMap<String, String>>> {
    match data.get(key) {
        None => Ok(None),
        Some(Entry::Hash(hash)) => Ok(Some(hash)),
        Some(_) => Err(cmd.wrong_type()),
    }
}

fn hash_mut<'d>(
    data: &'d mut HashMap<String, Entry>,
    key: &str,
    cmd: &Cmd<'_>,
) -> Result<&'d mut BTreeMap<String, String>> {
    let entry = data
        .entry(key.to_string())
        .or_insert_with(|| Entry::Hash(BTreeMap::new()));
    match entry {
        Entry::Hash(hash) => Ok(hash),
        _ => Err(cmd.wrong_type()),
    }
}

fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { len + index } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

/// Redis inclusive range semantics with negative offsets from the end.
fn slice_range(len: usize, start: i64, stop: i64) -> std::ops::Range<usize> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len {
        return 0..0;
    }
    start as usize..(stop + 1) as usize
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 && score.abs() < 1e15 {
        format!("{}", score as i64)
    } else {
        score.to_string()
    }
}
