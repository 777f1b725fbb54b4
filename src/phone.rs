/// Проверка номера телефона: ровно `+7` и 10 цифр.
pub fn is_valid(phone: &str) -> bool {
    match phone.strip_prefix("+7") {
        Some(rest) => rest.len() == 10 && rest.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}
